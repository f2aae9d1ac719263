//! Types and client-less behavior shared by the capi-upgrade crates
//!
//! This crate holds the cluster-api object model and the [`fieldpath`] extractor
//! used to locate nested values (such as CA material) inside those objects.
//! It performs no I/O and is re-exported from `capi-upgrade-client` under `core`.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod cluster;
pub use cluster::Cluster;

pub mod fieldpath;
pub use fieldpath::{FieldPath, FieldPathError, FieldValue, Fields};

pub mod metadata;
pub use metadata::{ObjectMeta, TypeMeta};

pub mod raw;
pub use raw::RawExtension;
