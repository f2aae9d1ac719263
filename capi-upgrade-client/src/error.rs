//! Error handling in [`capi_upgrade_client`][crate]
use thiserror::Error;

use crate::{ca::CaError, config::KubeconfigError, core::FieldPathError, secrets::BoxError};

/// Possible errors when resolving a [`Config`](crate::Config)
///
/// Every resolver either returns a usable configuration or one of these,
/// never both.
#[derive(Error, Debug)]
pub enum Error {
    /// The secret backend failed to return the secret
    #[error("failed to fetch secret {name:?}: {source}")]
    FetchSecret {
        /// Name of the requested secret
        name: String,
        /// Error returned by the backend
        #[source]
        source: BoxError,
    },

    /// The secret exists but lacks a required entry
    #[error("secret {name:?} has no {key:?} entry")]
    MissingSecretKey {
        /// Name of the secret
        name: String,
        /// The missing entry
        key: &'static str,
    },

    /// A field path could not be resolved on the cluster object
    #[error("failed to resolve field path: {0}")]
    FieldPath(#[source] FieldPathError),

    /// The value a field path resolved to lacks a required string entry
    #[error("value at {path:?} has no {key:?} string entry")]
    MissingFieldKey {
        /// The resolved path
        path: String,
        /// The missing entry
        key: &'static str,
    },

    /// CA material was present but could not be decoded
    #[error("invalid CA material: {0}")]
    DecodeCa(#[source] CaError),

    /// A kubeconfig document could not be parsed or loaded
    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[source] KubeconfigError),

    /// The server address is not a valid URI
    #[error("invalid server address {address:?}: {source}")]
    InvalidServer {
        /// The address as given
        address: String,
        /// Parse failure
        #[source]
        source: http::uri::InvalidUri,
    },
}

/// Broad classification of an [`Error`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The source itself could not be fetched
    Fetch,
    /// The source was fetched but lacks a required entry
    MissingField,
    /// A field path did not resolve
    FieldPath,
    /// Present material failed base64, PEM or key/certificate parsing
    Decode,
    /// A kubeconfig document was malformed or incomplete
    Kubeconfig,
    /// The server address was rejected
    InvalidServer,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FetchSecret { .. } => ErrorKind::Fetch,
            Error::MissingSecretKey { .. } | Error::MissingFieldKey { .. } => ErrorKind::MissingField,
            Error::FieldPath(_) => ErrorKind::FieldPath,
            Error::DecodeCa(_) => ErrorKind::Decode,
            Error::Kubeconfig(_) => ErrorKind::Kubeconfig,
            Error::InvalidServer { .. } => ErrorKind::InvalidServer,
        }
    }
}

impl From<FieldPathError> for Error {
    fn from(err: FieldPathError) -> Self {
        Error::FieldPath(err)
    }
}

impl From<CaError> for Error {
    fn from(err: CaError) -> Self {
        Error::DecodeCa(err)
    }
}

impl From<KubeconfigError> for Error {
    fn from(err: KubeconfigError) -> Self {
        Error::Kubeconfig(err)
    }
}
