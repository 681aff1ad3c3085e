use serde::{Deserialize, Serialize};

use crate::{Fields, MessageId};

/// A single log entry as read from the shared work queue.
///
/// Messages are produced externally and immutable once read; the runner
/// only classifies them (see [`crate::interpret`]) and eventually retires
/// them through the queue client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    id: MessageId,
    fields: Fields,
}

impl Message {
    /// Assemble a message from its broker id and field list.
    pub fn new(id: MessageId, fields: Fields) -> Self {
        Self { id, fields }
    }

    /// The broker-assigned entry id.
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// The ordered field mapping.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }
}
