//! Canonical JSON helpers.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{ErrorInfo, SolcheckError};

/// Serializes `value` to JSON with object keys in sorted order.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SolcheckError> {
    let tree = serde_json::to_value(value)
        .map_err(|err| SolcheckError::Serde(ErrorInfo::new("json_encode", err.to_string())))?;
    serde_json::to_vec(&tree)
        .map_err(|err| SolcheckError::Serde(ErrorInfo::new("json_encode", err.to_string())))
}

/// Serializes `value` to indented JSON with sorted keys.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, SolcheckError> {
    let tree = serde_json::to_value(value)
        .map_err(|err| SolcheckError::Serde(ErrorInfo::new("json_encode", err.to_string())))?;
    serde_json::to_string_pretty(&tree)
        .map_err(|err| SolcheckError::Serde(ErrorInfo::new("json_encode", err.to_string())))
}

/// Decodes JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SolcheckError> {
    serde_json::from_slice(bytes)
        .map_err(|err| SolcheckError::Serde(ErrorInfo::new("json_decode", err.to_string())))
}
