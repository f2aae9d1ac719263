//! Embedded JSON documents carried verbatim inside typed objects.
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Raw bytes of an embedded JSON document.
///
/// Provider specific configuration (`providerSpec.value`, `providerStatus`) is
/// stored this way and only decoded when something asks for a key inside it.
/// On the wire it is the JSON value itself, not a string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawExtension {
    /// The serialized document
    pub raw: Vec<u8>,
}

impl RawExtension {
    /// Wrap already serialized bytes.
    pub fn new(raw: impl Into<Vec<u8>>) -> Self {
        Self { raw: raw.into() }
    }

    /// Serialize a JSON value into a new extension.
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::to_vec(value).map(Self::new)
    }

    /// Deserialize the embedded document.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.raw)
    }

    /// The serialized bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

impl Serialize for RawExtension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.raw.is_empty() {
            return serializer.serialize_none();
        }
        self.to_json().map_err(ser::Error::custom)?.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawExtension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(Self::default());
        }
        Self::from_json(&value).map_err(de::Error::custom)
    }
}
