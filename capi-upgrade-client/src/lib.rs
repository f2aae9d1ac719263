//! Client configuration for a workload cluster, assembled from its CA material
//!
//! An upgrade has to reach the control plane of the cluster it upgrades before any
//! regular admin credential exists. This crate builds a [`Config`] (trusted root,
//! client certificate and key, server address) from one of three sources:
//!
//! - a secret holding the cluster CA as `cert` and `key`: [`resolve::from_ca_secret`]
//! - a field of the cluster object holding the CA: [`resolve::from_ca_cluster_field`]
//! - a secret holding a complete kubeconfig: [`resolve::from_kubeconfig_secret`]
//!
//! In the first two cases the CA keypair itself doubles as the client identity.
//!
//! # Example
//!
//! ```rust,no_run
//! use capi_upgrade_client::{resolve, secrets::SecretStore};
//!
//! # fn main() -> Result<(), capi_upgrade_client::Error> {
//! let secrets = SecretStore::default();
//! let config = resolve::from_ca_secret(&secrets, "capi-quickstart-ca", "capi-quickstart", "https://10.0.0.1:6443")?;
//! println!("talking to {}", config.cluster_url);
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod ca;
pub use ca::CaMaterial;

pub mod config;
pub use config::Config;

pub mod resolve;
pub use resolve::CredentialSource;

pub mod secrets;
pub use secrets::{Secret, SecretAccessor};

pub mod error;
pub use error::{Error, ErrorKind};

/// Re-exports from `capi-upgrade-core`
pub use capi_upgrade_core as core;

/// Convient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;
