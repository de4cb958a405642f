//! Process wiring for the KMS activation server: CLI/env configuration,
//! startup validation, an event-to-log bridge, and signal-driven shutdown.
//! Everything protocol- or storage-related lives in `kms-server` and its
//! dependencies; this crate only ever deals in `anyhow::Error`.

mod args;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser as _;
use kms_server::{Event, EventLevel, Hwid, ServerConfig};
use kms_store::ActivationStore;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use args::{Args, LogLevel};

const EXIT_OK: u8 = 0;
const EXIT_BIND_FAILED: u8 = 2;
const EXIT_STORAGE_FAILED: u8 = 3;
const EXIT_CATALOG_FAILED: u8 = 4;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.loglevel);

    if let Err(e) = kms_catalog::init() {
        error!("failed to load the product catalog: {e}");
        return ExitCode::from(EXIT_CATALOG_FAILED);
    }

    let hwid = match parse_hwid(&args.hwid) {
        Ok(hwid) => hwid,
        Err(e) => {
            error!("invalid --hwid: {e}");
            return ExitCode::from(EXIT_BIND_FAILED);
        }
    };

    let store = match args.sqlite.as_deref() {
        Some(path) => match ActivationStore::open(path).context("failed to open the activation store") {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                error!("{e:#}");
                return ExitCode::from(EXIT_STORAGE_FAILED);
            }
        },
        None => {
            warn!("no --sqlite path given, activation records will not persist across restarts");
            None
        }
    };

    let config = ServerConfig {
        bind_addr: args.ip,
        port: args.port,
        epid_override: args.epid,
        hwid,
        lcid: args.lcid,
        client_count: args.client_count,
        activation_interval_min: args.activation_interval,
        renewal_interval_min: args.renewal_interval,
        timeout_idle: args.timeout_idle.map(Duration::from_secs),
        ..ServerConfig::default()
    };

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let sink = tokio::spawn(run_event_sink(events_rx, args.loglevel.to_event_level()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let result = kms_server::run(config, store, events_tx, shutdown_rx).await;
    drop(sink.await);

    match result {
        Ok(()) => ExitCode::from(EXIT_OK),
        Err(e) => {
            // `ServerErrorKind` only names `BindFailed` today; any future
            // variant still maps to the same startup-failure exit code.
            error!("{e:#}");
            ExitCode::from(EXIT_BIND_FAILED)
        }
    }
}

/// Parses `--hwid`: either 16 hex characters or the literal `RANDOM`.
fn parse_hwid(raw: &str) -> anyhow::Result<Hwid> {
    if raw.eq_ignore_ascii_case("random") {
        return Ok(Hwid::Random);
    }

    anyhow::ensure!(raw.len() == 16, "expected 16 hex characters or `RANDOM`, got {raw:?}");

    let mut bytes = [0u8; 8];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&raw[i * 2..i * 2 + 2], 16).with_context(|| format!("invalid hex byte in {raw:?}"))?;
    }

    Ok(Hwid::Fixed(bytes))
}


/// Drains the event stream and renders each event through `tracing`,
/// filtered by the configured verbosity tier against [`Event::level`].
async fn run_event_sink(mut events: mpsc::UnboundedReceiver<Event>, floor: EventLevel) {
    while let Some(event) = events.recv().await {
        if event.level() > floor {
            continue;
        }

        match event {
            Event::RequestAccepted {
                peer,
                cmid,
                version,
                app_group,
                sku,
                request_time,
                client_count,
            } => {
                info!(
                    %peer, %cmid, version = ?version, %app_group, %sku, ticks = request_time.ticks(), client_count,
                    "activation request accepted"
                );
            }
            Event::ResponseSent {
                peer,
                cmid,
                epid,
                activated_count,
            } => {
                info!(%peer, %cmid, epid, activated_count, "activation response sent");
            }
            Event::ProtocolError { peer, kind, details } => {
                info!(%peer, kind = ?kind, details, "protocol error, connection dropped");
            }
            Event::StorageError { cmid, kind } => {
                info!(%cmid, kind = ?kind, "activation record could not be persisted");
            }
            Event::CatalogMiss { uuid, what } => {
                debug!(%uuid, what, "catalog has no entry, falling back to a generic name");
            }
            Event::ResourceError { peer, details } => {
                info!(peer = ?peer, details, "resource error");
            }
        }
    }
}

fn init_tracing(level: LogLevel) {
    let default_directive = match level {
        LogLevel::Mini => tracing::level_filters::LevelFilter::WARN,
        LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
        LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_directive.into())
        .with_env_var("KMS_LOG")
        .from_env_lossy();

    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true).compact().try_init();
}
