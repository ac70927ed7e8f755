//! Request and result shapes of the three cache operations.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ServiceError;

/// Every field is optional on the wire: a missing key is `""`, a missing
/// value is `null`, a missing flag is `false`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SetRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub persist: bool,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RemoveRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub erase: bool,
}

/// Result of a successful `set`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: Value,
}

/// Result of a `get`. Absence is a normal outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub key: String,
    pub value: Option<Value>,
}

impl Lookup {
    pub fn found(&self) -> bool {
        self.value.is_some()
    }
}

/// Decode a JSON request body, mapping any failure to `MalformedInput`.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ServiceError> {
    serde_json::from_slice(body).map_err(|e| ServiceError::MalformedInput(e.to_string()))
}
