use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::PARAM_CHANNEL;

/// Opaque job parameter mapping owned by the producer.
///
/// The runner copies parameters verbatim into the worker invocation and
/// never inspects values beyond the required routing key
/// ([`PARAM_CHANNEL`]).
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobParams(pub BTreeMap<String, String>);

impl JobParams {
    /// Create an empty parameter mapping.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Parse a JSON object of strings, e.g. `{"channel":"eval-1"}`.
    ///
    /// Anything else — arrays, nested objects, non-string values — is an
    /// error; producers own the mapping but its shape is fixed.
    pub fn from_json(raw: &str) -> ModelResult<Self> {
        let map: BTreeMap<String, String> =
            serde_json::from_str(raw).map_err(|e| ModelError::InvalidParams(e.to_string()))?;
        Ok(Self(map))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no parameters are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get a parameter value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The routing key, if present.
    pub fn channel(&self) -> Option<&str> {
        self.get(PARAM_CHANNEL)
    }

    /// Insert a parameter, replacing any previous value for the key.
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), value.into());
    }

    /// Iterate over all parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for JobParams {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}
