use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::{Hwid, ServerConfig};
use crate::error::{ServerError, ServerErrorKind, ServerResult};
use crate::events::{Event, EventSender};
use crate::session::{run_session, SessionContext};
use kms_store::ActivationStore;

/// Accepts connections until `shutdown` fires, spawning each one onto its
/// own task so sessions run fully concurrently (at least 256 simultaneous
/// connections are expected). Returns once every spawned session has
/// finished or the shutdown grace period elapsed, whichever comes first.
///
/// `shutdown` becoming `true` stops the accept loop immediately; in-flight
/// sessions are told to finish their current exchange and are given
/// `config.shutdown_grace` to do so before being dropped.
pub async fn run(
    config: ServerConfig,
    store: Option<Arc<ActivationStore>>,
    events: EventSender,
    mut shutdown: watch::Receiver<bool>,
) -> ServerResult<()> {
    let resolved_hwid = match config.hwid {
        Hwid::Fixed(bytes) => bytes,
        Hwid::Random => {
            let random = kms_crypto::rand_array::<8>();
            debug!("resolved a random hwid for this run");
            random
        }
    };

    let addr = std::net::SocketAddr::new(config.bind_addr, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::new("kms_server::run", ServerErrorKind::BindFailed).with_source(e))?;
    info!(%addr, "KMS listener bound");

    let ctx = SessionContext {
        config: Arc::new(config),
        resolved_hwid,
        store,
        events: events.clone(),
    };

    let mut sessions: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("shutdown signal received, leaving the accept loop");
                    break;
                }
            }

            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let session_ctx = ctx.clone();
                        let session_shutdown = shutdown.clone();
                        sessions.spawn(async move {
                            run_session(stream, peer, session_ctx, session_shutdown).await;
                        });
                    }
                    Err(e) => {
                        let _ = events.send(Event::ResourceError {
                            peer: None,
                            details: format!("accept failed: {e}"),
                        });
                    }
                }
            }
        }
    }

    drain(&mut sessions, ctx.config.shutdown_grace).await;
    Ok(())
}

/// Waits up to `grace` for every spawned session to finish on its own,
/// then aborts whatever is still running.
async fn drain(sessions: &mut JoinSet<()>, grace: Duration) {
    let outcome = tokio::time::timeout(grace, async {
        while sessions.join_next().await.is_some() {}
    })
    .await;

    if outcome.is_err() {
        debug!(remaining = sessions.len(), "shutdown grace period elapsed, aborting remaining sessions");
        sessions.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn binds_and_shuts_down_cleanly_with_no_connections() {
        let config = ServerConfig {
            bind_addr: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            ..ServerConfig::default()
        };
        let (_tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run(config, None, rx_to_sender(rx), shutdown_rx));
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    // run() takes an EventSender (the producing half); tests only need a
    // channel that won't immediately close, so the receiver is discarded.
    fn rx_to_sender(rx: mpsc::UnboundedReceiver<Event>) -> EventSender {
        let (tx, _rx2) = mpsc::unbounded_channel();
        drop(rx);
        tx
    }

    #[tokio::test]
    async fn bind_failure_is_reported_as_server_error() {
        let first = ServerConfig {
            bind_addr: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            ..ServerConfig::default()
        };
        let listener = TcpListener::bind(std::net::SocketAddr::new(first.bind_addr, 0)).await.unwrap();
        let taken_port = listener.local_addr().unwrap().port();

        let config = ServerConfig {
            bind_addr: Ipv4Addr::LOCALHOST.into(),
            port: taken_port,
            ..ServerConfig::default()
        };
        let (tx, _rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let result = run(config, None, tx, shutdown_rx).await;
        assert!(matches!(result.unwrap_err().kind(), ServerErrorKind::BindFailed));
        drop(listener);
    }

    #[tokio::test]
    async fn accepts_a_connection_and_completes_a_bind() {
        let config = ServerConfig {
            bind_addr: Ipv4Addr::LOCALHOST.into(),
            port: 0,
            ..ServerConfig::default()
        };
        // Bind ourselves first so we know a free port, then hand that exact
        // port to `run` after dropping our listener.
        let probe = TcpListener::bind(std::net::SocketAddr::new(config.bind_addr, 0)).await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let config = ServerConfig { port, ..config };
        let (tx, _rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let server_handle = tokio::spawn(run(config, None, tx, shutdown_rx));

        // Give the listener a moment to bind.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut client = tokio::net::TcpStream::connect(std::net::SocketAddr::new(Ipv4Addr::LOCALHOST.into(), port))
            .await
            .unwrap();
        client.write_all(b"not a real PDU, just checking the socket accepts").await.unwrap();
        let mut buf = [0u8; 1];
        let _ = client.read(&mut buf).await;

        shutdown_tx.send(true).unwrap();
        server_handle.await.unwrap().unwrap();
    }
}
