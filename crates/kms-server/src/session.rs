use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use kms_proto::{ClientRequest, Envelope, ProtocolErrorKind};
use kms_rpc::{BindAckPdu, BindPdu, FaultPdu, PduType, RequestPdu, ResponsePdu, RpcFrame, RpcFramed, ACTIVATION_REQUEST_OPNUM};
use kms_store::ActivationStore;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tracing::debug;

use crate::config::ServerConfig;
use crate::events::{Event, EventSender};

/// Everything one session needs, assembled once by [`crate::run`] and
/// cloned cheaply (an `Arc` clone per field) into each spawned connection.
#[derive(Clone)]
pub struct SessionContext {
    pub config: Arc<ServerConfig>,
    /// The resolved 8-byte HWID — already a concrete value even when
    /// [`crate::Hwid::Random`] was configured (resolved once at startup).
    pub resolved_hwid: [u8; 8],
    pub store: Option<Arc<ActivationStore>>,
    pub events: EventSender,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
enum SessionState {
    Init,
    BindSeen,
}

/// Drives one accepted connection through `Init -> BindSeen -> Active`:
/// a `Bind` must precede the first `Request`, after which requests are
/// served strictly sequentially until the peer disconnects,
/// a protocol error closes the socket, the idle timeout fires, or
/// `shutdown` asks the session to finish its current exchange and stop.
pub(crate) async fn run_session<S>(stream: S, peer: SocketAddr, ctx: SessionContext, mut shutdown: watch::Receiver<bool>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = RpcFramed::new(stream);
    let mut state = SessionState::Init;

    loop {
        let frame = match read_with_timeout(&mut framed, ctx.config.timeout_idle).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!(%peer, "session idle timeout, closing");
                return;
            }
            Err(e) => {
                report_transport_error(&ctx, peer, &e);
                return;
            }
        };

        match frame.ptype {
            PduType::Bind => {
                let Ok(()) = handle_bind(&mut framed, &frame, &ctx, peer).await else {
                    return;
                };
                state = SessionState::BindSeen;
            }
            PduType::Request => {
                if state == SessionState::Init {
                    emit(
                        &ctx,
                        Event::ProtocolError {
                            peer,
                            kind: ProtocolErrorKind::BindBeforeRequest,
                            details: "request received before bind".to_owned(),
                        },
                    );
                    return;
                }
                if !handle_request(&mut framed, &frame, peer, &ctx).await {
                    return;
                }
            }
            other => {
                let _ = framed.write_pdu(PduType::Fault, frame.call_id, &FaultPdu::unknown_opnum(0)).await;
                emit(
                    &ctx,
                    Event::ProtocolError {
                        peer,
                        kind: ProtocolErrorKind::MalformedPdu,
                        details: format!("unexpected PDU type in this context: {other:?}"),
                    },
                );
                return;
            }
        }

        if *shutdown.borrow() {
            debug!(%peer, "graceful shutdown: session finished its exchange, closing");
            return;
        }
    }
}

async fn handle_bind<S>(framed: &mut RpcFramed<S>, frame: &RpcFrame, ctx: &SessionContext, peer: SocketAddr) -> Result<(), ()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let bind: BindPdu = match kms_core::decode(&frame.body) {
        Ok(bind) => bind,
        Err(e) => {
            emit(
                ctx,
                Event::ProtocolError {
                    peer,
                    kind: ProtocolErrorKind::MalformedPdu,
                    details: e.to_string(),
                },
            );
            return Err(());
        }
    };

    let assoc_group_id = if bind.assoc_group_id != 0 { bind.assoc_group_id } else { 1 };
    let ack = BindAckPdu::accepting(&bind, assoc_group_id);
    if framed.write_pdu(PduType::BindAck, frame.call_id, &ack).await.is_err() {
        emit(
            ctx,
            Event::ResourceError {
                peer: Some(peer),
                details: "failed to write BindAck".to_owned(),
            },
        );
        return Err(());
    }

    Ok(())
}

/// Decodes and serves one `Request`, returning whether the session should
/// keep reading. A `false` return means the caller already closed (or
/// should close) the connection.
async fn handle_request<S>(framed: &mut RpcFramed<S>, frame: &RpcFrame, peer: SocketAddr, ctx: &SessionContext) -> bool
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request_pdu: RequestPdu = match kms_core::decode(&frame.body) {
        Ok(pdu) => pdu,
        Err(e) => {
            emit(
                ctx,
                Event::ProtocolError {
                    peer,
                    kind: ProtocolErrorKind::MalformedPdu,
                    details: e.to_string(),
                },
            );
            return false;
        }
    };

    if request_pdu.opnum != ACTIVATION_REQUEST_OPNUM {
        let _ = framed
            .write_pdu(PduType::Fault, frame.call_id, &FaultPdu::unknown_opnum(request_pdu.context_id))
            .await;
        emit(
            ctx,
            Event::ProtocolError {
                peer,
                kind: ProtocolErrorKind::UnknownOpnum(request_pdu.opnum),
                details: "opnum outside the KMS activation interface".to_owned(),
            },
        );
        return false;
    }

    let (envelope, client_request) = match Envelope::open(&request_pdu.stub_data) {
        Ok(opened) => opened,
        Err(e) => {
            emit(
                ctx,
                Event::ProtocolError {
                    peer,
                    kind: e.kind().clone(),
                    details: e.to_string(),
                },
            );
            return false;
        }
    };

    report_catalog_coverage(ctx, &client_request);

    let response = build_and_record_response(ctx, peer, &client_request);

    let inner = match kms_core::encode_vec(&response) {
        Ok(bytes) => bytes,
        Err(e) => {
            emit(
                ctx,
                Event::ResourceError {
                    peer: Some(peer),
                    details: format!("failed to encode KMS response: {e}"),
                },
            );
            return false;
        }
    };

    let sealed = match envelope.seal(&inner) {
        Ok(bytes) => bytes,
        Err(e) => {
            emit(
                ctx,
                Event::ResourceError {
                    peer: Some(peer),
                    details: format!("failed to seal response envelope: {e}"),
                },
            );
            return false;
        }
    };

    let response_pdu = ResponsePdu::new(request_pdu.context_id, sealed);
    if framed.write_pdu(PduType::Response, frame.call_id, &response_pdu).await.is_err() {
        emit(
            ctx,
            Event::ResourceError {
                peer: Some(peer),
                details: "failed to write Response".to_owned(),
            },
        );
        return false;
    }

    true
}

/// Looks up any EPID already on file, builds the response (reusing it if
/// present), then upserts the activation record — in that order, so a
/// first-time request's freshly derived EPID is the one persisted and a
/// repeat request's persisted EPID is the one echoed back.
fn build_and_record_response(ctx: &SessionContext, peer: SocketAddr, client_request: &ClientRequest) -> kms_proto::KmsResponse {
    let cmid = client_request.client_machine_id;
    let app_group = client_request.application_group;
    let sku = client_request.activation_id;

    let existing_epid = ctx.store.as_ref().and_then(|store| match store.existing_epid(cmid, app_group) {
        Ok(epid) => epid,
        Err(e) => {
            emit(ctx, Event::StorageError { cmid, kind: e.kind().clone() });
            None
        }
    });

    emit(
        ctx,
        Event::RequestAccepted {
            peer,
            cmid,
            version: client_request.version.major_minor(),
            app_group,
            sku,
            request_time: client_request.request_time,
            client_count: client_request.required_client_count,
        },
    );

    let response = kms_proto::build_response(
        client_request,
        &ctx.config.to_activation_config(),
        existing_epid.as_deref(),
        ctx.resolved_hwid,
    );

    if let Some(store) = &ctx.store {
        if let Err(e) = store.upsert(cmid, app_group, sku, &response.kms_epid, client_request.request_time) {
            emit(ctx, Event::StorageError { cmid, kind: e.kind().clone() });
        }
    }

    emit(
        ctx,
        Event::ResponseSent {
            peer,
            cmid,
            epid: response.kms_epid.clone(),
            activated_count: response.activated_machines,
        },
    );

    response
}

/// Flags application-group/SKU UUIDs the static catalog has no entry for;
/// the response is still built and served from the raw UUID, this is
/// purely a debug-level signal.
fn report_catalog_coverage(ctx: &SessionContext, request: &ClientRequest) {
    if kms_catalog::kms_pid_prefix(request.application_group).is_none() {
        emit(
            ctx,
            Event::CatalogMiss {
                uuid: request.application_group,
                what: "application_group",
            },
        );
    }
    if kms_catalog::sku_group(request.activation_id).is_none() {
        emit(
            ctx,
            Event::CatalogMiss {
                uuid: request.activation_id,
                what: "sku",
            },
        );
    }
}

fn emit(ctx: &SessionContext, event: Event) {
    let _ = ctx.events.send(event);
}

/// Classifies a framing-level I/O failure: a clean peer disconnect is
/// unremarkable and not reported; anything else is surfaced as either a
/// protocol or resource error depending on what `kms_rpc::RpcFramed`
/// tagged it as.
fn report_transport_error(ctx: &SessionContext, peer: SocketAddr, e: &io::Error) {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => {}
        io::ErrorKind::InvalidData => emit(
            ctx,
            Event::ProtocolError {
                peer,
                kind: ProtocolErrorKind::MalformedPdu,
                details: e.to_string(),
            },
        ),
        _ => emit(
            ctx,
            Event::ResourceError {
                peer: Some(peer),
                details: e.to_string(),
            },
        ),
    }
}

async fn read_with_timeout<S>(framed: &mut RpcFramed<S>, idle: Option<Duration>) -> io::Result<Option<RpcFrame>>
where
    S: AsyncRead + Unpin,
{
    match idle {
        Some(duration) => match tokio::time::timeout(duration, framed.read_pdu()).await {
            Ok(Ok(frame)) => Ok(Some(frame)),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Ok(None),
        },
        None => framed.read_pdu().await.map(Some),
    }
}
