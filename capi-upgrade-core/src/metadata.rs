//! Metadata structs shared by the cluster-api objects.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fieldpath::{FieldValue, Fields};

/// Type information that is flattened into every kubernetes object
#[derive(Deserialize, Serialize, Clone, Default, Debug, Eq, PartialEq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    /// The version of the API
    pub api_version: String,

    /// The name of the API
    pub kind: String,
}

/// The subset of object metadata the upgrade tooling reads.
#[derive(Deserialize, Serialize, Clone, Default, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Name of the object, unique within its namespace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Namespace the object lives in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Unique identifier assigned by the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Opaque version used for optimistic concurrency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// Identifying key/value pairs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Non-identifying key/value pairs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Fields for ObjectMeta {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        Some(match name {
            "name" => FieldValue::string(self.name.as_deref()),
            "namespace" => FieldValue::string(self.namespace.as_deref()),
            "uid" => FieldValue::string(self.uid.as_deref()),
            "resourceVersion" => FieldValue::string(self.resource_version.as_deref()),
            "labels" => FieldValue::json(string_map(&self.labels)),
            "annotations" => FieldValue::json(string_map(&self.annotations)),
            _ => return None,
        })
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

fn string_map(map: &BTreeMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_addressable_by_key() {
        let meta = ObjectMeta {
            labels: [("cluster.x-k8s.io/cluster-name".to_string(), "prod".to_string())].into(),
            ..Default::default()
        };
        let path = crate::FieldPath::parse("labels.cluster.x-k8s.io/cluster-name").unwrap();
        // dots split the label key, so only the prefix is looked up
        assert!(path.extract(&meta).is_err());

        let labels = crate::FieldPath::parse("labels").unwrap().extract_json(&meta).unwrap();
        assert_eq!(labels["cluster.x-k8s.io/cluster-name"], "prod");
    }

    #[test]
    fn unset_name_is_null() {
        let meta = ObjectMeta::default();
        assert_eq!(meta.field("name").map(|v| v.kind()), Some("null"));
        assert!(meta.field("Name").is_none());
    }
}
