//! Strategies resolving a [`Config`] from where a cluster's credentials live.
//!
//! Each resolver is a straight pipeline (fetch, check presence, decode, assemble)
//! that stops at the first failure. The result is either a complete [`Config`] or
//! an [`Error`]; nothing is retried and nothing is cached between calls.
use http::Uri;
use serde_json::Value;

use crate::{
    ca::CaMaterial,
    config::{Config, KubeConfigOptions, Kubeconfig, KubeconfigError},
    core::{Cluster, FieldPath, Fields},
    secrets::{Secret, SecretAccessor},
    Error, Result,
};

/// Entry holding the base64 encoded CA certificate
pub const CERT_KEY: &str = "cert";
/// Entry holding the base64 encoded CA private key
pub const KEY_KEY: &str = "key";
/// Entry holding a complete kubeconfig document
pub const KUBECONFIG_KEY: &str = "kubeconfig";

/// Where the credentials for a cluster are kept.
#[derive(Clone, Debug)]
pub enum CredentialSource {
    /// A secret with `cert` and `key` entries
    CaSecret {
        /// Name of the secret
        name: String,
        /// Name of the cluster, only used to label logs
        cluster_name: String,
    },
    /// A field of the cluster object resolving to `cert` and `key` strings
    CaClusterField {
        /// The cluster object
        cluster: Box<Cluster>,
        /// Dotted path to the field, e.g. `spec.providerSpec.value.test`
        path: String,
    },
    /// A secret with a `kubeconfig` entry
    KubeconfigSecret {
        /// Name of the secret
        name: String,
    },
}

impl CredentialSource {
    /// Resolve with the strategy matching this source.
    pub fn resolve<S>(&self, secrets: &S, server: &str) -> Result<Config>
    where
        S: SecretAccessor + ?Sized,
    {
        match self {
            CredentialSource::CaSecret { name, cluster_name } => {
                from_ca_secret(secrets, name, cluster_name, server)
            }
            CredentialSource::CaClusterField { cluster, path } => {
                from_ca_cluster_field(cluster.as_ref(), path, server)
            }
            CredentialSource::KubeconfigSecret { name } => from_kubeconfig_secret(secrets, name, server),
        }
    }
}

/// Build a [`Config`] from a secret holding the cluster CA.
///
/// The secret must carry base64 encoded PEM in its `cert` and `key` entries.
/// The CA certificate becomes both the trusted root and the client certificate,
/// and the CA key the client key. `cluster_name` only labels the tracing span.
#[tracing::instrument(skip(secrets), level = "debug")]
pub fn from_ca_secret<S>(secrets: &S, name: &str, cluster_name: &str, server: &str) -> Result<Config>
where
    S: SecretAccessor + ?Sized,
{
    let secret = fetch(secrets, name)?;
    let cert = secret_entry(&secret, name, CERT_KEY)?;
    let key = secret_entry(&secret, name, KEY_KEY)?;

    let ca = CaMaterial::decode(cert, key)?;
    tracing::debug!("decoded CA material");
    Ok(Config::from_ca_material(&ca, parse_server(server)?))
}

/// Build a [`Config`] from CA material stored on the cluster object itself.
///
/// `path` is a dotted [`FieldPath`] that must end on an object (possibly an
/// embedded document) with string `cert` and `key` entries, each base64
/// encoded PEM. The CA keypair is used as in [`from_ca_secret`].
#[tracing::instrument(skip(cluster), level = "debug")]
pub fn from_ca_cluster_field(cluster: &dyn Fields, path: &str, server: &str) -> Result<Config> {
    let path = FieldPath::parse(path)?;
    let node = path.extract_json(cluster)?;
    tracing::trace!("resolved field path");

    let cert = string_entry(&node, &path, CERT_KEY)?;
    let key = string_entry(&node, &path, KEY_KEY)?;

    let ca = CaMaterial::decode(cert.as_bytes(), key.as_bytes())?;
    tracing::debug!("decoded CA material");
    Ok(Config::from_ca_material(&ca, parse_server(server)?))
}

/// Build a [`Config`] from a secret holding a complete kubeconfig.
///
/// The document's current context selects the cluster and user. Its server,
/// trust roots and credentials are used as they are, so `server` is ignored.
pub fn from_kubeconfig_secret<S>(secrets: &S, name: &str, server: &str) -> Result<Config>
where
    S: SecretAccessor + ?Sized,
{
    from_kubeconfig_secret_with_options(secrets, name, server, &KubeConfigOptions::default())
}

/// Like [`from_kubeconfig_secret`], selecting context, cluster or user with `options`.
#[tracing::instrument(skip(secrets), level = "debug")]
pub fn from_kubeconfig_secret_with_options<S>(
    secrets: &S,
    name: &str,
    server: &str,
    options: &KubeConfigOptions,
) -> Result<Config>
where
    S: SecretAccessor + ?Sized,
{
    let secret = fetch(secrets, name)?;
    let document = secret_entry(&secret, name, KUBECONFIG_KEY)?;
    let text = std::str::from_utf8(document).map_err(KubeconfigError::InvalidUtf8)?;
    let kubeconfig = Kubeconfig::from_yaml(text)?;
    tracing::trace!("parsed kubeconfig document");

    let config = Config::from_custom_kubeconfig(kubeconfig, options)?;
    if config.cluster_url.to_string().trim_end_matches('/') != server.trim_end_matches('/') {
        tracing::trace!(cluster_url = %config.cluster_url, "kubeconfig server differs from the given address");
    }
    Ok(config)
}

fn fetch<S>(secrets: &S, name: &str) -> Result<Secret>
where
    S: SecretAccessor + ?Sized,
{
    tracing::trace!("fetching secret");
    secrets.get(name).map_err(|source| Error::FetchSecret {
        name: name.to_owned(),
        source,
    })
}

fn secret_entry<'a>(secret: &'a Secret, name: &str, key: &'static str) -> Result<&'a [u8]> {
    secret.get(key).ok_or_else(|| Error::MissingSecretKey {
        name: name.to_owned(),
        key,
    })
}

fn string_entry<'a>(node: &'a Value, path: &FieldPath, key: &'static str) -> Result<&'a str> {
    node.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MissingFieldKey {
            path: path.to_string(),
            key,
        })
}

fn parse_server(server: &str) -> Result<Uri> {
    server.parse::<Uri>().map_err(|source| Error::InvalidServer {
        address: server.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::RawExtension, secrets::SecretStore, ErrorKind};
    use serde_json::json;

    const CA_CERT: &str = include_str!("../testdata/ca.crt.b64");
    const CA_KEY: &str = include_str!("../testdata/ca.key.b64");

    fn ca_secret() -> Secret {
        Secret::new("name", [(CERT_KEY, CA_CERT), (KEY_KEY, CA_KEY)])
    }

    #[test]
    fn ca_secret_is_root_and_identity() {
        let store = SecretStore::default().with(ca_secret());
        let config = from_ca_secret(&store, "name", "clustername", "https://example.com:6443").unwrap();
        assert_eq!(config.cluster_url.host(), Some("example.com"));
        assert_eq!(config.cluster_url.port_u16(), Some(6443));
        assert_eq!(config.root_cert.as_ref().map(Vec::len), Some(1));
        assert!(config.client_certificate.is_some());
        assert!(config.client_key.is_some());
    }

    #[test]
    fn missing_entries_are_not_fetch_errors() {
        let store = SecretStore::default().with(Secret::new("name", [(CERT_KEY, CA_CERT)]));
        let err = from_ca_secret(&store, "name", "clustername", "https://example.com:6443").unwrap_err();
        assert!(matches!(err, Error::MissingSecretKey { key: "key", .. }));
        assert_eq!(err.kind(), ErrorKind::MissingField);

        let err = from_ca_secret(&store, "other", "clustername", "https://example.com:6443").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fetch);
    }

    #[test]
    fn bad_server_address_is_rejected() {
        let store = SecretStore::default().with(ca_secret());
        let err = from_ca_secret(&store, "name", "clustername", "https://exa mple.com").unwrap_err();
        assert!(matches!(err, Error::InvalidServer { ref address, .. } if address == "https://exa mple.com"));
    }

    #[test]
    fn cluster_field_through_embedded_document() {
        let mut cluster = Cluster::new("capi-quickstart");
        cluster.spec.provider_spec.value =
            Some(RawExtension::from_json(&json!({"test": {"cert": CA_CERT, "key": CA_KEY}})).unwrap());

        let config = from_ca_cluster_field(&cluster, "spec.providerSpec.value.test", "https://example.com:8888").unwrap();
        assert_eq!(config.cluster_url.port_u16(), Some(8888));

        let err = from_ca_cluster_field(&cluster, "spec.providerSpec.value", "https://example.com:8888").unwrap_err();
        assert!(matches!(err, Error::MissingFieldKey { key: "cert", .. }));
    }

    #[test]
    fn non_string_entries_count_as_missing() {
        let mut cluster = Cluster::new("capi-quickstart");
        cluster.spec.provider_spec.value =
            Some(RawExtension::from_json(&json!({"cert": 1, "key": CA_KEY})).unwrap());
        let err = from_ca_cluster_field(&cluster, "spec.providerSpec.value", "https://example.com").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
    }

    #[test]
    fn credential_source_dispatches() {
        let store = SecretStore::default().with(ca_secret());
        let source = CredentialSource::CaSecret {
            name: "name".into(),
            cluster_name: "clustername".into(),
        };
        assert!(source.resolve(&store, "https://example.com:6443").is_ok());

        let source = CredentialSource::KubeconfigSecret { name: "name".into() };
        let err = source.resolve(&store, "https://example.com:6443").unwrap_err();
        assert!(matches!(err, Error::MissingSecretKey { key: KUBECONFIG_KEY, .. }));

        let source = CredentialSource::CaClusterField {
            cluster: Box::default(),
            path: "some field".into(),
        };
        let err = source.resolve(&store, "https://example.com:8888").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldPath);
    }
}
