//! The secret backend as seen by the resolvers.
//!
//! Resolvers only ever need to fetch a secret by name, so the backend is a
//! single-method capability. Production code wires in a real API client;
//! tests use a closure or a [`SecretStore`].
use std::{collections::BTreeMap, fmt};

use thiserror::Error;

use crate::core::ObjectMeta;

/// Type-erased error returned by a secret backend
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A fetched secret: metadata plus named binary entries.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret {
    /// Standard object's metadata
    pub metadata: ObjectMeta,
    /// The secret entries, already decoded from the API's base64 transport
    pub data: BTreeMap<String, Vec<u8>>,
}

impl Secret {
    /// Create a named secret from `(key, value)` entries.
    pub fn new<K, V>(name: &str, data: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        Self {
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..Default::default()
            },
            data: data.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Look up a single entry.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.data.get(key).map(Vec::as_slice)
    }
}

// Entry values stay out of logs.
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("metadata", &self.metadata)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Fetch secrets by name.
///
/// Implementations report "not found" and transport failures as errors;
/// the resolvers wrap and propagate them unchanged.
pub trait SecretAccessor {
    /// Fetch the secret called `name`.
    fn get(&self, name: &str) -> Result<Secret, BoxError>;
}

impl<F> SecretAccessor for F
where
    F: Fn(&str) -> Result<Secret, BoxError>,
{
    fn get(&self, name: &str) -> Result<Secret, BoxError> {
        self(name)
    }
}

/// Returned by [`SecretStore`] for unknown names
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("secret {name:?} not found")]
pub struct SecretNotFound {
    /// The requested name
    pub name: String,
}

/// An in-memory [`SecretAccessor`] keyed by secret name.
#[derive(Clone, Debug, Default)]
pub struct SecretStore {
    secrets: BTreeMap<String, Secret>,
}

impl SecretStore {
    /// Add a secret, keyed by its `metadata.name`.
    ///
    /// Secrets without a name are stored under the empty string.
    #[must_use]
    pub fn with(mut self, secret: Secret) -> Self {
        self.insert(secret);
        self
    }

    /// Add or replace a secret, returning the previous one.
    pub fn insert(&mut self, secret: Secret) -> Option<Secret> {
        let name = secret.metadata.name.clone().unwrap_or_default();
        self.secrets.insert(name, secret)
    }
}

impl SecretAccessor for SecretStore {
    fn get(&self, name: &str) -> Result<Secret, BoxError> {
        self.secrets.get(name).cloned().ok_or_else(|| {
            Box::new(SecretNotFound {
                name: name.to_owned(),
            }) as BoxError
        })
    }
}
