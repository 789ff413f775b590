//! YAML and JSON helpers that map parse failures onto [`HpmcError::Serde`].

use serde::{de::DeserializeOwned, Serialize};

use crate::errors::{ErrorInfo, HpmcError};

fn serde_error(code: &str, err: impl ToString) -> HpmcError {
    HpmcError::Serde(ErrorInfo::new(code, err.to_string()))
}

/// Serializes a value into YAML.
pub fn to_yaml_string<T: Serialize>(value: &T) -> Result<String, HpmcError> {
    serde_yaml::to_string(value).map_err(|err| serde_error("yaml-serialize", err))
}

/// Deserializes a YAML document into the requested type.
pub fn from_yaml_str<T: DeserializeOwned>(contents: &str) -> Result<T, HpmcError> {
    serde_yaml::from_str(contents).map_err(|err| serde_error("yaml-deserialize", err))
}

/// Serializes a value into compact JSON.
pub fn to_json_string<T: Serialize>(value: &T) -> Result<String, HpmcError> {
    serde_json::to_string(value).map_err(|err| serde_error("json-serialize", err))
}

/// Deserializes a JSON document into the requested type.
pub fn from_json_str<T: DeserializeOwned>(contents: &str) -> Result<T, HpmcError> {
    serde_json::from_str(contents).map_err(|err| serde_error("json-deserialize", err))
}
