use std::io;

use bytes::BytesMut;
use kms_core::{Encode, WriteCursor};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::header::{CommonHeader, PduType, PfcFlags};

/// One fully reassembled logical PDU: the `ptype`/`call_id` of its first
/// fragment, and the concatenated body bytes of every fragment in order.
///
/// Concatenating raw fragment bodies before decoding works because a
/// conformant array's `actual_count` describes the logical payload length
/// regardless of where DCE/RPC happened to cut the wire into fragments —
/// the same reason real RPC runtimes never repeat a PDU's fixed header
/// fields in continuation fragments.
#[derive(Clone, Debug)]
pub struct RpcFrame {
    pub ptype: PduType,
    pub call_id: u32,
    pub body: Vec<u8>,
}

/// Reads and writes DCE/RPC PDUs over a connection-oriented byte stream,
/// mirroring the "peek fixed header, then read the rest" accumulation
/// pattern used for TPKT/RDP framing, generalized here to also stitch
/// `PFC_FIRST_FRAG`/`PFC_LAST_FRAG` fragments back into one logical PDU.
pub struct RpcFramed<S> {
    stream: S,
    buf: BytesMut,
}

impl<S> RpcFramed<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: BytesMut::new(),
        }
    }
}

impl<S> RpcFramed<S>
where
    S: AsyncRead + Unpin,
{
    /// Accumulates at least `length` bytes from the stream, returning
    /// exactly `length` and keeping any leftover buffered for the next read.
    async fn read_exact(&mut self, length: usize) -> io::Result<BytesMut> {
        loop {
            if self.buf.len() >= length {
                return Ok(self.buf.split_to(length));
            }

            let additional = length - self.buf.len();
            self.buf.reserve(additional);

            let read = self.stream.read_buf(&mut self.buf).await?;
            if read == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "peer closed mid-frame"));
            }
        }
    }

    /// Reads one logical PDU, following `PFC_LAST_FRAG` across as many
    /// fragments as the client sends.
    pub async fn read_pdu(&mut self) -> io::Result<RpcFrame> {
        let mut call_id = None;
        let mut ptype = None;
        let mut body = Vec::new();

        loop {
            let header_bytes = self.read_exact(CommonHeader::SIZE).await?;
            let header: CommonHeader =
                kms_core::decode(&header_bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

            let fragment_body = self.read_exact(header.body_length()).await?;
            body.extend_from_slice(&fragment_body);

            let is_last = header.pfc_flags.is_last_frag();
            call_id.get_or_insert(header.call_id);
            ptype.get_or_insert(header.ptype);

            if is_last {
                break;
            }
        }

        Ok(RpcFrame {
            ptype: ptype.expect("read_exact would have errored before the loop could exit empty"),
            call_id: call_id.expect("read_exact would have errored before the loop could exit empty"),
            body,
        })
    }
}

impl<S> RpcFramed<S>
where
    S: AsyncWrite + Unpin,
{
    /// Writes `pdu` as a single-fragment PDU. This engine never produces a
    /// response spanning more than one fragment, so no outbound
    /// fragmentation is implemented.
    pub async fn write_pdu<E: Encode>(&mut self, ptype: PduType, call_id: u32, pdu: &E) -> io::Result<()> {
        let frag_length = u16::try_from(CommonHeader::SIZE + pdu.size())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pdu too large for a single fragment"))?;

        let header = CommonHeader {
            ptype,
            pfc_flags: PfcFlags::single_fragment(),
            frag_length,
            call_id,
        };

        let mut buf = vec![0u8; usize::from(frag_length)];
        {
            let mut cursor = WriteCursor::new(&mut buf);
            header
                .encode(&mut cursor)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            pdu.encode(&mut cursor)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        }

        self.stream.write_all(&buf).await
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::duplex;

    use super::*;
    use crate::bind::{BindAckPdu, BindPdu, KMS_INTERFACE_UUID, NDR_TRANSFER_SYNTAX_UUID};
    use crate::request::RequestPdu;

    #[tokio::test]
    async fn reassembles_fragmented_request() {
        let (client, server) = duplex(4096);

        let full_pdu = RequestPdu {
            alloc_hint: 10,
            context_id: 0,
            opnum: 0,
            stub_data: vec![0xAB; 10],
        };
        let encoded = kms_core::encode_vec(&full_pdu).unwrap();
        let (first_half, second_half) = encoded.split_at(encoded.len() / 2);

        let mut client_framed = RpcFramed::new(client);

        let first_header = CommonHeader {
            ptype: PduType::Request,
            pfc_flags: PfcFlags::from_bits(PfcFlags::FIRST_FRAG),
            frag_length: u16::try_from(CommonHeader::SIZE + first_half.len()).unwrap(),
            call_id: 1,
        };
        let mut first_frame = kms_core::encode_vec(&first_header).unwrap();
        first_frame.extend_from_slice(first_half);

        let second_header = CommonHeader {
            ptype: PduType::Request,
            pfc_flags: PfcFlags::from_bits(PfcFlags::LAST_FRAG),
            frag_length: u16::try_from(CommonHeader::SIZE + second_half.len()).unwrap(),
            call_id: 1,
        };
        let mut second_frame = kms_core::encode_vec(&second_header).unwrap();
        second_frame.extend_from_slice(second_half);

        tokio::io::AsyncWriteExt::write_all(&mut client_framed.stream, &first_frame)
            .await
            .unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut client_framed.stream, &second_frame)
            .await
            .unwrap();

        let mut server_framed = RpcFramed::new(server);
        let frame = server_framed.read_pdu().await.unwrap();
        assert_eq!(frame.ptype, PduType::Request);
        let decoded: RequestPdu = kms_core::decode(&frame.body).unwrap();
        assert_eq!(decoded.stub_data, full_pdu.stub_data);
    }

    #[tokio::test]
    async fn writes_single_fragment_bind_ack() {
        let (client, server) = duplex(4096);
        let mut server_framed = RpcFramed::new(server);

        let bind = BindPdu {
            max_xmit_frag: 4096,
            max_recv_frag: 4096,
            assoc_group_id: 0,
            context_id: 0,
            abstract_syntax: KMS_INTERFACE_UUID,
            abstract_syntax_version: (1, 0),
            transfer_syntax: NDR_TRANSFER_SYNTAX_UUID,
            transfer_syntax_version: 2,
        };
        let ack = BindAckPdu::accepting(&bind, 1);
        server_framed.write_pdu(PduType::BindAck, 7, &ack).await.unwrap();
        drop(server_framed);

        let mut client_framed = RpcFramed::new(client);
        let frame = client_framed.read_pdu().await.unwrap();
        assert_eq!(frame.ptype, PduType::BindAck);
        assert_eq!(frame.call_id, 7);
    }
}
