use std::fmt;

use serde::{Deserialize, Serialize};

/// Broker-assigned token identifying a log entry.
///
/// Ids are assigned monotonically per producer by the underlying log
/// (e.g. Redis stream ids such as `1526919030474-0`) and are never
/// fabricated by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap a broker-provided id.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw id as assigned by the broker.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for MessageId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}
