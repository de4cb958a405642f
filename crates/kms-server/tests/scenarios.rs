//! End-to-end scenarios driving a real `kms_server::run` listener over a
//! loopback TCP socket, each named after the concrete scenario it exercises.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use kms_core::{Filetime, Uuid};
use kms_proto::{ClientRequest, Envelope, KmsVersion, LicenseStatus, MachineName};
use kms_rpc::{
    BindPdu, PduType, RequestPdu, ResponsePdu, RpcFramed, ACTIVATION_REQUEST_OPNUM, KMS_INTERFACE_UUID, KMS_INTERFACE_VERSION,
    NDR_TRANSFER_SYNTAX_UUID, NDR_TRANSFER_SYNTAX_VERSION,
};
use kms_server::{Event, Hwid, ServerConfig};
use kms_store::ActivationStore;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

fn windows_group() -> Uuid {
    Uuid::parse("55c92734-d682-4d71-983e-d6ec3f16059f").unwrap()
}

fn windows_11_pro() -> Uuid {
    Uuid::parse("2de67392-b7a7-462a-b1ca-108dd189f588").unwrap()
}

fn office_group_sku() -> Uuid {
    Uuid::parse("d450596f-894d-49e0-966a-fd39ed4c4c64").unwrap()
}

fn sample_cmid() -> Uuid {
    Uuid::parse("00112233-4455-6677-8899-aabbccddeeff").unwrap()
}

fn sample_request(version: KmsVersion, app_group: Uuid, sku: Uuid, cmid: Uuid) -> ClientRequest {
    ClientRequest {
        version,
        is_client_pid_verified: true,
        license_status: LicenseStatus::Licensed,
        graceful_shutdown: 0,
        activation_request_count: 1,
        application_group: app_group,
        activation_id: sku,
        key_management_id: Uuid::nil(),
        client_machine_id: cmid,
        required_client_count: 25,
        request_time: Filetime::from_ticks(132_000_000_000_000_000),
        previous_client_machine_id: Uuid::nil(),
        machine_name: MachineName::new("WIN11-HOST").unwrap(),
    }
}

/// Spawns `kms_server::run` on an OS-assigned loopback port, returning its
/// address, a join handle, a shutdown sender, and the event receiver.
async fn spawn_server(
    store: Option<Arc<ActivationStore>>,
) -> (SocketAddr, tokio::task::JoinHandle<()>, watch::Sender<bool>, mpsc::UnboundedReceiver<Event>) {
    let probe = TcpListener::bind(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0)).await.unwrap();
    let port = probe.local_addr().unwrap().port();
    drop(probe);

    let config = ServerConfig {
        bind_addr: Ipv4Addr::LOCALHOST.into(),
        port,
        hwid: Hwid::Fixed(kms_server::DEFAULT_HWID),
        ..ServerConfig::default()
    };
    let addr = SocketAddr::new(config.bind_addr, config.port);

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        kms_server::run(config, store, events_tx, shutdown_rx).await.unwrap();
    });

    // Give the listener a moment to bind before clients connect.
    tokio::time::sleep(Duration::from_millis(20)).await;

    (addr, handle, shutdown_tx, events_rx)
}

async fn bind_and_connect(addr: SocketAddr) -> RpcFramed<TcpStream> {
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut framed = RpcFramed::new(stream);

    let bind = BindPdu {
        max_xmit_frag: 4096,
        max_recv_frag: 4096,
        assoc_group_id: 0,
        context_id: 0,
        abstract_syntax: KMS_INTERFACE_UUID,
        abstract_syntax_version: KMS_INTERFACE_VERSION,
        transfer_syntax: NDR_TRANSFER_SYNTAX_UUID,
        transfer_syntax_version: NDR_TRANSFER_SYNTAX_VERSION,
    };
    framed.write_pdu(PduType::Bind, 1, &bind).await.unwrap();
    let ack_frame = framed.read_pdu().await.unwrap();
    assert_eq!(ack_frame.ptype, PduType::BindAck);

    framed
}

async fn shutdown(shutdown_tx: watch::Sender<bool>, handle: tokio::task::JoinHandle<()>) {
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

/// S1: a V6 Windows 11 request gets a response whose EPID carries the
/// Windows group's prefix and whose envelope CMAC verifies.
#[tokio::test]
async fn s1_v6_windows_11_response_verifies() {
    let (addr, handle, shutdown_tx, _events) = spawn_server(None).await;
    let mut framed = bind_and_connect(addr).await;

    let request = sample_request(KmsVersion::V6, windows_group(), windows_11_pro(), sample_cmid());
    let inner = kms_core::encode_vec(&request).unwrap();
    let stub_data = Envelope::V6 { iv: [0x11; 16] }.seal(&inner).unwrap();
    let request_pdu = RequestPdu {
        alloc_hint: u32::try_from(stub_data.len()).unwrap(),
        context_id: 0,
        opnum: ACTIVATION_REQUEST_OPNUM,
        stub_data,
    };
    framed.write_pdu(PduType::Request, 2, &request_pdu).await.unwrap();

    let response_frame = framed.read_pdu().await.unwrap();
    assert_eq!(response_frame.ptype, PduType::Response);
    let response_pdu: ResponsePdu = kms_core::decode(&response_frame.body).unwrap();

    let (envelope, response) = Envelope::open(&response_pdu.stub_data).unwrap();
    assert!(matches!(envelope, Envelope::V6 { .. }));
    assert!(response.kms_epid.starts_with("03612"));
    assert_eq!(response.client_machine_id, request.client_machine_id);
    assert_eq!(response.request_time, request.request_time);

    drop(framed);
    shutdown(shutdown_tx, handle).await;
}

/// S2: a V5 Office request round-trips through the RC4 envelope; opening
/// the returned salt/ciphertext pair recovers a valid response.
#[tokio::test]
async fn s2_v5_office_response_verifies() {
    let (addr, handle, shutdown_tx, _events) = spawn_server(None).await;
    let mut framed = bind_and_connect(addr).await;

    let sku = office_group_sku();
    let app_group = kms_catalog::sku_group(sku).unwrap();
    let request = sample_request(KmsVersion::V5, app_group, sku, sample_cmid());
    let inner = kms_core::encode_vec(&request).unwrap();
    let stub_data = Envelope::V5 { salt: [0x22; 16] }.seal(&inner).unwrap();
    let request_pdu = RequestPdu {
        alloc_hint: u32::try_from(stub_data.len()).unwrap(),
        context_id: 0,
        opnum: ACTIVATION_REQUEST_OPNUM,
        stub_data,
    };
    framed.write_pdu(PduType::Request, 2, &request_pdu).await.unwrap();

    let response_frame = framed.read_pdu().await.unwrap();
    let response_pdu: ResponsePdu = kms_core::decode(&response_frame.body).unwrap();
    let (envelope, response) = Envelope::open(&response_pdu.stub_data).unwrap();
    assert!(matches!(envelope, Envelope::V5 { .. }));
    assert_eq!(response.client_machine_id, request.client_machine_id);

    drop(framed);
    shutdown(shutdown_tx, handle).await;
}

/// S3: a legacy V4 request is accepted and its keyed-hash envelope
/// verifies on both legs of the exchange.
#[tokio::test]
async fn s3_v4_legacy_response_verifies() {
    let (addr, handle, shutdown_tx, _events) = spawn_server(None).await;
    let mut framed = bind_and_connect(addr).await;

    let request = sample_request(KmsVersion::V4, windows_group(), windows_11_pro(), sample_cmid());
    let inner = kms_core::encode_vec(&request).unwrap();
    let stub_data = Envelope::V4.seal(&inner).unwrap();
    let request_pdu = RequestPdu {
        alloc_hint: u32::try_from(stub_data.len()).unwrap(),
        context_id: 0,
        opnum: ACTIVATION_REQUEST_OPNUM,
        stub_data,
    };
    framed.write_pdu(PduType::Request, 2, &request_pdu).await.unwrap();

    let response_frame = framed.read_pdu().await.unwrap();
    let response_pdu: ResponsePdu = kms_core::decode(&response_frame.body).unwrap();
    let (envelope, response) = Envelope::open(&response_pdu.stub_data).unwrap();
    assert!(matches!(envelope, Envelope::V4));
    assert!(response.kms_host_id.is_none());

    drop(framed);
    shutdown(shutdown_tx, handle).await;
}

/// S4: flipping a byte of the V6 request's trailing CMAC closes the
/// connection with no response and a `BadV6Cmac` protocol-error event.
#[tokio::test]
async fn s4_bad_cmac_closes_without_a_response() {
    let (addr, handle, shutdown_tx, mut events) = spawn_server(None).await;
    let mut framed = bind_and_connect(addr).await;

    let request = sample_request(KmsVersion::V6, windows_group(), windows_11_pro(), sample_cmid());
    let inner = kms_core::encode_vec(&request).unwrap();
    let mut stub_data = Envelope::V6 { iv: [0x33; 16] }.seal(&inner).unwrap();
    *stub_data.last_mut().unwrap() ^= 0xFF;

    let request_pdu = RequestPdu {
        alloc_hint: u32::try_from(stub_data.len()).unwrap(),
        context_id: 0,
        opnum: ACTIVATION_REQUEST_OPNUM,
        stub_data,
    };
    framed.write_pdu(PduType::Request, 2, &request_pdu).await.unwrap();

    // The server closes the socket without writing a Response PDU.
    assert!(framed.read_pdu().await.is_err());

    let mut saw_bad_cmac = false;
    while let Ok(event) = events.try_recv() {
        if let Event::ProtocolError { kind, .. } = event {
            if matches!(kind, kms_proto::ProtocolErrorKind::BadV6Cmac) {
                saw_bad_cmac = true;
            }
        }
    }
    assert!(saw_bad_cmac);

    shutdown(shutdown_tx, handle).await;
}

/// S5: an unknown SKU still gets served a valid response; the catalog
/// miss surfaces only as a debug-level event, never a client-visible error.
#[tokio::test]
async fn s5_unknown_sku_still_serves_a_valid_response() {
    let (addr, handle, shutdown_tx, mut events) = spawn_server(None).await;
    let mut framed = bind_and_connect(addr).await;

    let unknown_sku = Uuid::parse("00000000-0000-0000-0000-000000000001").unwrap();
    let request = sample_request(KmsVersion::V6, windows_group(), unknown_sku, sample_cmid());
    let inner = kms_core::encode_vec(&request).unwrap();
    let stub_data = Envelope::V6 { iv: [0x44; 16] }.seal(&inner).unwrap();
    let request_pdu = RequestPdu {
        alloc_hint: u32::try_from(stub_data.len()).unwrap(),
        context_id: 0,
        opnum: ACTIVATION_REQUEST_OPNUM,
        stub_data,
    };
    framed.write_pdu(PduType::Request, 2, &request_pdu).await.unwrap();

    let response_frame = framed.read_pdu().await.unwrap();
    let response_pdu: ResponsePdu = kms_core::decode(&response_frame.body).unwrap();
    let (_envelope, response) = Envelope::open(&response_pdu.stub_data).unwrap();
    assert_eq!(response.client_machine_id, request.client_machine_id);

    let mut saw_catalog_miss = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, Event::CatalogMiss { what: "sku", .. }) {
            saw_catalog_miss = true;
        }
    }
    assert!(saw_catalog_miss);

    drop(framed);
    shutdown(shutdown_tx, handle).await;
}

/// S6: two requests from the same CMID against a persistent store receive
/// the same EPID, and the store shows a record exists after the first.
#[tokio::test]
async fn s6_same_cmid_reuses_the_persisted_epid() {
    let store = Arc::new(ActivationStore::open(":memory:").unwrap());
    let (addr, handle, shutdown_tx, _events) = spawn_server(Some(Arc::clone(&store))).await;

    let cmid = sample_cmid();

    let mut first = bind_and_connect(addr).await;
    let request = sample_request(KmsVersion::V6, windows_group(), windows_11_pro(), cmid);
    let inner = kms_core::encode_vec(&request).unwrap();
    let stub_data = Envelope::V6 { iv: [0x55; 16] }.seal(&inner).unwrap();
    first
        .write_pdu(
            PduType::Request,
            2,
            &RequestPdu {
                alloc_hint: u32::try_from(stub_data.len()).unwrap(),
                context_id: 0,
                opnum: ACTIVATION_REQUEST_OPNUM,
                stub_data,
            },
        )
        .await
        .unwrap();
    let first_frame = first.read_pdu().await.unwrap();
    let first_pdu: ResponsePdu = kms_core::decode(&first_frame.body).unwrap();
    let (_e1, first_response) = Envelope::open(&first_pdu.stub_data).unwrap();
    drop(first);

    assert_eq!(store.existing_epid(cmid, windows_group()).unwrap().as_deref(), Some(first_response.kms_epid.as_str()));

    let mut second = bind_and_connect(addr).await;
    let stub_data2 = Envelope::V6 { iv: [0x66; 16] }.seal(&inner).unwrap();
    second
        .write_pdu(
            PduType::Request,
            2,
            &RequestPdu {
                alloc_hint: u32::try_from(stub_data2.len()).unwrap(),
                context_id: 0,
                opnum: ACTIVATION_REQUEST_OPNUM,
                stub_data: stub_data2,
            },
        )
        .await
        .unwrap();
    let second_frame = second.read_pdu().await.unwrap();
    let second_pdu: ResponsePdu = kms_core::decode(&second_frame.body).unwrap();
    let (_e2, second_response) = Envelope::open(&second_pdu.stub_data).unwrap();

    assert_eq!(second_response.kms_epid, first_response.kms_epid);

    drop(second);
    shutdown(shutdown_tx, handle).await;
}
