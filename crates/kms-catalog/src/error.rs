use core::fmt;

pub type CatalogResult<T> = Result<T, CatalogError>;
pub type CatalogError = kms_error::Error<CatalogErrorKind>;

#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum CatalogErrorKind {
    MalformedJson,
    InvalidUuid { entry: &'static str, value: String },
}

impl fmt::Display for CatalogErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedJson => write!(f, "embedded catalog JSON failed to parse"),
            Self::InvalidUuid { entry, value } => write!(f, "{entry} has an invalid uuid: {value:?}"),
        }
    }
}
