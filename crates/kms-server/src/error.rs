use core::fmt;

pub type ServerResult<T> = Result<T, ServerError>;
pub type ServerError = kms_error::Error<ServerErrorKind>;

/// Fatal, startup-class failures [`crate::run`] can report.
///
/// Everything recoverable — a malformed request, a dropped socket, a
/// storage hiccup — is reported through the [`crate::Event`] stream
/// instead and never unwinds out of a session.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum ServerErrorKind {
    /// The listening socket failed to bind.
    BindFailed,
}

impl fmt::Display for ServerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BindFailed => write!(f, "failed to bind the KMS listener"),
        }
    }
}
