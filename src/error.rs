/// Errors produced while building, serializing and signing XAdES signatures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("algorithm not available: {0}")]
    AlgorithmNotAvailable(String),

    #[error("certificate encoding error: {0}")]
    CertificateEncoding(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("signing error: {0}")]
    Signing(String),
}

impl Error {
    pub(crate) fn unsupported_in_v1(what: &str) -> Self {
        Error::UnsupportedFeature(format!("{} requires EN 319 132 (TS 101 903 selected)", what))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
