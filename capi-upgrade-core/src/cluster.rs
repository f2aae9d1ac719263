//! The cluster-api `v1alpha1` `Cluster` object.
//!
//! Only the parts of the schema the upgrade tooling reads are modelled.
//! Provider specific configuration stays an opaque [`RawExtension`] until a
//! [`FieldPath`](crate::FieldPath) reaches into it.
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    fieldpath::{FieldValue, Fields},
    metadata::{ObjectMeta, TypeMeta},
    raw::RawExtension,
};

/// API version of the modelled `Cluster`
pub const API_VERSION: &str = "cluster.k8s.io/v1alpha1";

/// Kind of the modelled `Cluster`
pub const KIND: &str = "Cluster";

/// A cluster-api `Cluster`
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// The type fields, not always present
    #[serde(flatten, default)]
    pub types: Option<TypeMeta>,
    /// Object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Desired state
    #[serde(default)]
    pub spec: ClusterSpec,
    /// Observed state
    #[serde(default)]
    pub status: ClusterStatus,
}

impl Cluster {
    /// Create a named `Cluster` with its type fields filled in.
    pub fn new(name: &str) -> Self {
        Self {
            types: Some(TypeMeta {
                api_version: API_VERSION.into(),
                kind: KIND.into(),
            }),
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Attach a namespace
    #[must_use]
    pub fn within(mut self, ns: &str) -> Self {
        self.metadata.namespace = Some(ns.into());
        self
    }
}

/// Desired state of a [`Cluster`]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Cluster network configuration
    #[serde(default)]
    pub cluster_network: ClusterNetworkingConfig,
    /// Provider specific configuration
    #[serde(default)]
    pub provider_spec: ProviderSpec,
}

/// Network ranges of a [`Cluster`]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkingConfig {
    /// Network ranges from which service VIPs are allocated
    #[serde(default)]
    pub services: NetworkRanges,
    /// Network ranges from which pod IPs are allocated
    #[serde(default)]
    pub pods: NetworkRanges,
    /// Domain name for services
    #[serde(default)]
    pub service_domain: String,
}

/// A list of CIDR blocks
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRanges {
    /// The CIDR blocks
    #[serde(default)]
    pub cidr_blocks: Vec<String>,
}

/// Provider specific configuration, either inline or referenced
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    /// Inline provider configuration, an embedded JSON document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<RawExtension>,
    /// Source of the configuration when not inline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_from: Option<ProviderSpecSource>,
}

/// Where to look up provider configuration that is not inline
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpecSource {
    /// Reference to a machine class holding the configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_class: Option<MachineClassRef>,
}

/// Reference to a machine class
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineClassRef {
    /// Name of the machine class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Namespace of the machine class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Provider the class belongs to
    #[serde(default)]
    pub provider: String,
}

/// Observed state of a [`Cluster`]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Endpoints the control plane can be reached on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_endpoints: Vec<ApiEndpoint>,
    /// Provider specific status, an embedded JSON document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<RawExtension>,
    /// Machine readable reason for a terminal problem
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// Human readable description of a terminal problem
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// A control plane endpoint
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiEndpoint {
    /// Hostname or IP address
    pub host: String,
    /// Port number
    pub port: i32,
}

impl ClusterStatus {
    /// The first endpoint as an `https://host:port` address.
    pub fn server_address(&self) -> Option<String> {
        self.api_endpoints
            .first()
            .map(|ep| format!("https://{}:{}", ep.host, ep.port))
    }
}

impl Fields for Cluster {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        Some(match name {
            "apiVersion" => FieldValue::string(self.types.as_ref().map(|t| t.api_version.as_str())),
            "kind" => FieldValue::string(self.types.as_ref().map(|t| t.kind.as_str())),
            "metadata" => FieldValue::object(&self.metadata),
            "spec" => FieldValue::object(&self.spec),
            "status" => FieldValue::object(&self.status),
            _ => return None,
        })
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Fields for ClusterSpec {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        Some(match name {
            "clusterNetwork" => FieldValue::object(&self.cluster_network),
            "providerSpec" => FieldValue::object(&self.provider_spec),
            _ => return None,
        })
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Fields for ClusterNetworkingConfig {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        Some(match name {
            "services" => FieldValue::object(&self.services),
            "pods" => FieldValue::object(&self.pods),
            "serviceDomain" => FieldValue::json(self.service_domain.as_str()),
            _ => return None,
        })
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Fields for NetworkRanges {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "cidrBlocks" => Some(FieldValue::json(self.cidr_blocks.clone())),
            _ => None,
        }
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Fields for ProviderSpec {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        Some(match name {
            "value" => raw_field(self.value.as_ref()),
            "valueFrom" => FieldValue::optional(self.value_from.as_ref()),
            _ => return None,
        })
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Fields for ProviderSpecSource {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "machineClass" => Some(FieldValue::optional(self.machine_class.as_ref())),
            _ => None,
        }
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Fields for MachineClassRef {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        Some(match name {
            "name" => FieldValue::string(self.name.as_deref()),
            "namespace" => FieldValue::string(self.namespace.as_deref()),
            "provider" => FieldValue::json(self.provider.as_str()),
            _ => return None,
        })
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Fields for ClusterStatus {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        Some(match name {
            "apiEndpoints" => FieldValue::json(
                self.api_endpoints
                    .iter()
                    .map(|ep| json!({"host": ep.host, "port": ep.port}))
                    .collect::<Vec<_>>(),
            ),
            "providerStatus" => raw_field(self.provider_status.as_ref()),
            "errorReason" => FieldValue::string(self.error_reason.as_deref()),
            "errorMessage" => FieldValue::string(self.error_message.as_deref()),
            _ => return None,
        })
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

fn raw_field(ext: Option<&RawExtension>) -> FieldValue<'_> {
    ext.map_or(FieldValue::Null, |ext| FieldValue::Raw(ext.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldPath;
    use assert_json_diff::assert_json_eq;

    const CLUSTER_YAML: &str = r#"
apiVersion: cluster.k8s.io/v1alpha1
kind: Cluster
metadata:
  name: capi-quickstart
  namespace: default
spec:
  clusterNetwork:
    services:
      cidrBlocks: ["10.96.0.0/12"]
    pods:
      cidrBlocks: ["192.168.0.0/16"]
    serviceDomain: cluster.local
  providerSpec:
    value:
      apiVersion: awsprovider/v1alpha1
      kind: AWSClusterProviderSpec
      region: us-east-1
      caKeyPair:
        cert: Y2VydA==
        key: a2V5
status:
  apiEndpoints:
  - host: 10.0.0.1
    port: 6443
"#;

    #[test]
    fn cluster_deserializes_with_embedded_provider_spec() {
        let cluster: Cluster = serde_yaml::from_str(CLUSTER_YAML).unwrap();
        assert_eq!(cluster.metadata.name.as_deref(), Some("capi-quickstart"));
        assert_eq!(cluster.types.as_ref().map(|t| t.kind.as_str()), Some(KIND));
        assert_eq!(cluster.status.server_address().as_deref(), Some("https://10.0.0.1:6443"));

        let spec = cluster.spec.provider_spec.value.as_ref().unwrap().to_json().unwrap();
        assert_eq!(spec["region"], "us-east-1");
    }

    #[test]
    fn cluster_serializes_back_to_the_same_document() {
        let cluster: Cluster = serde_yaml::from_str(CLUSTER_YAML).unwrap();
        let expected: Value = serde_yaml::from_str(CLUSTER_YAML).unwrap();
        assert_json_eq!(serde_json::to_value(&cluster).unwrap(), expected);
    }

    #[test]
    fn field_names_follow_serialized_casing() {
        let cluster: Cluster = serde_yaml::from_str(CLUSTER_YAML).unwrap();
        let key = FieldPath::parse("spec.providerSpec.value.caKeyPair.key").unwrap();
        assert_eq!(key.extract_json(&cluster).unwrap(), "a2V5");

        let domain = FieldPath::parse("spec.clusterNetwork.serviceDomain").unwrap();
        assert_eq!(domain.extract_json(&cluster).unwrap(), "cluster.local");

        assert!(FieldPath::parse("spec.provider_spec").unwrap().extract(&cluster).is_err());
        assert!(FieldPath::parse("Spec").unwrap().extract(&cluster).is_err());
    }

    #[test]
    fn typed_subtree_materializes_as_json() {
        let cluster = Cluster::new("test").within("kube-system");
        let meta = FieldPath::parse("metadata").unwrap().extract_json(&cluster).unwrap();
        assert_json_eq!(meta, json!({"name": "test", "namespace": "kube-system"}));
        let kind = FieldPath::parse("kind").unwrap().extract_json(&cluster).unwrap();
        assert_eq!(kind, KIND);
    }
}
