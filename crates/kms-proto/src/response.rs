use kms_core::{read_utf16le_string, utf16le_string_size, write_utf16le_string, Decode, DecodeResult, Encode, EncodeResult, Filetime, ReadCursor, Uuid, WriteCursor};

use crate::version::KmsVersion;

/// The built KMS Response, common to all three envelope versions. `kms_host_id`
/// is populated only for V6 and omitted on the wire otherwise.
///
/// Note on `kms_epid`: this is encoded as a length-prefixed UTF-16LE string
/// (the same codec `MachineName` uses) rather than a fixed 16-wchar buffer,
/// because a derived EPID (prefix + activation-count segment + lcid + date,
/// see [`crate::epid::derive_epid`]) does not fit in 15 usable characters.
/// See `DESIGN.md` for this deviation.
#[derive(Clone, Debug)]
pub struct KmsResponse {
    pub client_machine_id: Uuid,
    pub request_time: Filetime,
    pub version: KmsVersion,
    pub application_group: Uuid,
    pub activated_machines: u32,
    pub activation_interval: u32,
    pub renewal_interval: u32,
    pub kms_epid: String,
    pub kms_host_id: Option<[u8; 16]>,
}

impl Decode<'_> for KmsResponse {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        let client_machine_id = Uuid::decode(src)?;
        let request_time = Filetime::decode(src)?;
        let version = KmsVersion::decode(src)?;
        let application_group = Uuid::decode(src)?;
        let activated_machines = src.try_read_u32()?;
        let activation_interval = src.try_read_u32()?;
        let renewal_interval = src.try_read_u32()?;
        let kms_epid = read_utf16le_string("kms_epid", src)?;
        let has_host_id = src.try_read_u8()? != 0;
        let kms_host_id = if has_host_id { Some(src.read_array::<16>()) } else { None };

        Ok(Self {
            client_machine_id,
            request_time,
            version,
            application_group,
            activated_machines,
            activation_interval,
            renewal_interval,
            kms_epid,
            kms_host_id,
        })
    }
}

impl Encode for KmsResponse {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        self.client_machine_id.encode(dst)?;
        self.request_time.encode(dst)?;
        self.version.encode(dst)?;
        self.application_group.encode(dst)?;
        dst.write_u32(self.activated_machines);
        dst.write_u32(self.activation_interval);
        dst.write_u32(self.renewal_interval);
        write_utf16le_string("kms_epid", dst, &self.kms_epid)?;
        match self.kms_host_id {
            Some(host_id) => {
                dst.write_u8(1);
                dst.write_array(host_id);
            }
            None => dst.write_u8(0),
        }
        Ok(())
    }

    fn size(&self) -> usize {
        self.client_machine_id.size()
            + self.request_time.size()
            + self.version.size()
            + self.application_group.size()
            + 4 // activated_machines
            + 4 // activation_interval
            + 4 // renewal_interval
            + utf16le_string_size(&self.kms_epid)
            + 1 // host-id presence flag
            + self.kms_host_id.map_or(0, |_| 16)
    }
}
