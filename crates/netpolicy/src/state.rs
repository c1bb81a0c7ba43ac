use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;

/// A serialized network state document.
///
/// The bytes are kept verbatim, but when a `RawState` appears inside another
/// serialized structure (a policy spec, a captured-states cache) it is
/// embedded as the document tree itself rather than as an opaque string, so
/// policy files read naturally:
///
/// ```yaml
/// desiredState:
///   interfaces:
///   - name: br1
///     type: linux-bridge
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RawState(Vec<u8>);

impl RawState {
    pub fn new<B: Into<Vec<u8>>>(bytes: B) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the document into its tree form. Empty bytes parse as null.
    pub fn to_value(&self) -> Result<Value, serde_yaml::Error> {
        if self.0.is_empty() {
            return Ok(Value::Null);
        }
        serde_yaml::from_slice(&self.0)
    }

    pub fn from_value(value: &Value) -> Result<Self, serde_yaml::Error> {
        let text = serde_yaml::to_string(value)?;
        Ok(Self(text.into_bytes()))
    }
}

impl From<&[u8]> for RawState {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for RawState {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl std::fmt::Debug for RawState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawState({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for RawState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.to_value().map_err(S::Error::custom)?;
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(RawState::default());
        }
        RawState::from_value(&value).map_err(D::Error::custom)
    }
}

/// The shape name of a value, as spelled in filter type-mismatch errors.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Sequence(_) => "[]",
        Value::Mapping(_) => "map",
        Value::Tagged(_) => "tagged",
    }
}

/// Compact single-line rendering of a document value for error messages.
pub(crate) fn render(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}
