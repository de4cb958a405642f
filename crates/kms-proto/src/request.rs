use kms_core::{Decode, DecodeResult, Encode, EncodeResult, Filetime, ReadCursor, Uuid, WriteCursor};
use kms_error::InvalidFieldErr;

use crate::machine_name::MachineName;
use crate::version::KmsVersion;

/// Mirrors the Windows Software Licensing status values a client reports in
/// its request (`SL_GENUINE_STATE`/license-status family); only the handful
/// a KMS host needs to echo or log are modeled.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum LicenseStatus {
    Unlicensed = 0,
    Licensed = 1,
    OutOfBoxGrace = 2,
    OutOfToleranceGrace = 3,
    NonGenuineGrace = 4,
    Notification = 5,
    ExtendedGrace = 6,
}

impl LicenseStatus {
    fn from_u8(value: u8) -> DecodeResult<Self> {
        match value {
            0 => Ok(Self::Unlicensed),
            1 => Ok(Self::Licensed),
            2 => Ok(Self::OutOfBoxGrace),
            3 => Ok(Self::OutOfToleranceGrace),
            4 => Ok(Self::NonGenuineGrace),
            5 => Ok(Self::Notification),
            6 => Ok(Self::ExtendedGrace),
            _ => Err(kms_core::DecodeError::invalid_field(
                "license_status",
                "license_status",
                "unknown license status value",
            )),
        }
    }
}

/// The decoded KMS Client Request (`ActivationRequest`'s inner payload,
/// shared verbatim across V4/V5/V6 once the envelope is opened).
#[derive(Clone, Debug)]
pub struct ClientRequest {
    pub version: KmsVersion,
    pub is_client_pid_verified: bool,
    pub license_status: LicenseStatus,
    pub graceful_shutdown: u32,
    pub activation_request_count: u32,
    pub application_group: Uuid,
    pub activation_id: Uuid,
    pub key_management_id: Uuid,
    pub client_machine_id: Uuid,
    pub required_client_count: u32,
    pub request_time: Filetime,
    pub previous_client_machine_id: Uuid,
    pub machine_name: MachineName,
}

impl Decode<'_> for ClientRequest {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        let version = KmsVersion::decode(src)?;
        let is_client_pid_verified = src.try_read_u8()? != 0;
        let license_status = LicenseStatus::from_u8(src.try_read_u8()?)?;
        let graceful_shutdown = src.try_read_u32()?;
        let activation_request_count = src.try_read_u32()?;
        let application_group = Uuid::decode(src)?;
        let activation_id = Uuid::decode(src)?;
        let key_management_id = Uuid::decode(src)?;
        let client_machine_id = Uuid::decode(src)?;
        let required_client_count = src.try_read_u32()?;
        let request_time = Filetime::decode(src)?;
        let previous_client_machine_id = Uuid::decode(src)?;
        let machine_name = MachineName::decode(src)?;

        Ok(Self {
            version,
            is_client_pid_verified,
            license_status,
            graceful_shutdown,
            activation_request_count,
            application_group,
            activation_id,
            key_management_id,
            client_machine_id,
            required_client_count,
            request_time,
            previous_client_machine_id,
            machine_name,
        })
    }
}

impl Encode for ClientRequest {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        self.version.encode(dst)?;
        dst.write_u8(u8::from(self.is_client_pid_verified));
        dst.write_u8(self.license_status as u8);
        dst.write_u32(self.graceful_shutdown);
        dst.write_u32(self.activation_request_count);
        self.application_group.encode(dst)?;
        self.activation_id.encode(dst)?;
        self.key_management_id.encode(dst)?;
        self.client_machine_id.encode(dst)?;
        dst.write_u32(self.required_client_count);
        self.request_time.encode(dst)?;
        self.previous_client_machine_id.encode(dst)?;
        self.machine_name.encode(dst)?;
        Ok(())
    }

    fn size(&self) -> usize {
        self.version.size()
            + 1 // is_client_pid_verified
            + 1 // license_status
            + 4 // graceful_shutdown
            + 4 // activation_request_count
            + self.application_group.size()
            + self.activation_id.size()
            + self.key_management_id.size()
            + self.client_machine_id.size()
            + 4 // required_client_count
            + self.request_time.size()
            + self.previous_client_machine_id.size()
            + self.machine_name.size()
    }
}
