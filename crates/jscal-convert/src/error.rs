use thiserror::Error;

/// Conversion errors.
///
/// Invalid properties are collected during a conversion and reported
/// together; every other variant aborts the conversion immediately.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Invalid properties: {}", .0.join(", "))]
    InvalidProperties(Vec<String>),

    #[error("Malformed calendar data: {0}")]
    Structural(String),

    #[error("Event has no UID")]
    MissingUid,

    #[error("Resource error: {0}")]
    Resource(String),

    #[error(transparent)]
    RfcError(#[from] jscal_rfc::error::RfcError),

    #[error(transparent)]
    CoreError(#[from] jscal_core::error::CoreError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ConvertError {
    /// Returns the invalid property paths, if this is a property error.
    #[must_use]
    pub fn invalid_properties(&self) -> &[String] {
        match self {
            Self::InvalidProperties(paths) => paths,
            _ => &[],
        }
    }
}

pub type ConvertResult<T> = std::result::Result<T, ConvertError>;
