//! DCE/RPC-over-TCP framing: the `Bind`/`BindAck`/`Request`/`Response`/
//! `Fault` PDU types KMS activation rides on, and the fragment-reassembling
//! stream reader/writer built on top of them.

mod bind;
mod fault;
mod framed;
mod header;
mod ndr;
mod request;
mod response;

pub use bind::{
    BindAckPdu, BindPdu, ContextResult, KMS_INTERFACE_UUID, KMS_INTERFACE_VERSION, MAX_FRAG_SIZE, NDR_TRANSFER_SYNTAX_UUID,
    NDR_TRANSFER_SYNTAX_VERSION,
};
pub use fault::{FaultPdu, NCA_S_OP_RNG_ERROR};
pub use framed::{RpcFrame, RpcFramed};
pub use header::{CommonHeader, PduType, PfcFlags};
pub use request::{RequestPdu, ACTIVATION_REQUEST_OPNUM};
pub use response::ResponsePdu;
