//! In-process work log with consumer-group semantics.
//!
//! A [`MemoryHub`] plays the broker: it stores entries, tracks per-group
//! claims and acknowledgements, and wakes blocked readers on publication.
//! Any number of [`MemoryLog`] clients (the consumers) can share one hub,
//! which makes the mutual-exclusion and redelivery behavior of the real
//! broker observable in plain unit tests.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use drover_model::{Fields, Message, MessageId};

use crate::{QueueResult, WorkQueue};

#[derive(Default)]
struct GroupState {
    owner: Option<String>,
    acked: bool,
}

struct Entry {
    id: MessageId,
    fields: Fields,
    groups: HashMap<String, GroupState>,
}

#[derive(Default)]
struct HubState {
    next_seq: u64,
    groups: HashSet<String>,
    entries: Vec<Entry>,
}

/// Shared in-memory log; the broker stand-in.
pub struct MemoryHub {
    state: Mutex<HubState>,
    version: watch::Sender<u64>,
}

impl MemoryHub {
    /// Create an empty hub.
    pub fn new() -> Arc<Self> {
        let (version, _) = watch::channel(0);
        Arc::new(Self {
            state: Mutex::new(HubState::default()),
            version,
        })
    }

    /// Append an entry and wake blocked readers.
    ///
    /// Ids are assigned monotonically; zero padding keeps lexicographic
    /// and numeric order aligned.
    pub fn publish(&self, fields: Fields) -> MessageId {
        let id = {
            let mut state = self.state.lock().expect("hub lock poisoned");
            state.next_seq += 1;
            let id = MessageId::new(format!("{:010}-0", state.next_seq));
            state.entries.push(Entry {
                id: id.clone(),
                fields,
                groups: HashMap::new(),
            });
            id
        };
        self.bump();
        id
    }

    /// Release all unacknowledged claims held by a consumer.
    ///
    /// This is the stand-in for the broker's liveness policy: once a
    /// consumer is considered dead, its claims become claimable again.
    pub fn drop_consumer(&self, consumer: &str) {
        {
            let mut state = self.state.lock().expect("hub lock poisoned");
            for entry in &mut state.entries {
                for group in entry.groups.values_mut() {
                    if !group.acked && group.owner.as_deref() == Some(consumer) {
                        group.owner = None;
                    }
                }
            }
        }
        self.bump();
    }

    /// Number of entries still in the log.
    pub fn len(&self) -> usize {
        self.state.lock().expect("hub lock poisoned").entries.len()
    }

    /// Check if the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an entry is still present in the log.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.state
            .lock()
            .expect("hub lock poisoned")
            .entries
            .iter()
            .any(|e| &e.id == id)
    }

    /// The consumer currently holding the claim on an entry, if any.
    pub fn claim_holder(&self, group: &str, id: &MessageId) -> Option<String> {
        let state = self.state.lock().expect("hub lock poisoned");
        state
            .entries
            .iter()
            .find(|e| &e.id == id)
            .and_then(|e| e.groups.get(group))
            .and_then(|g| g.owner.clone())
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn claim_next(&self, group: &str, consumer: &str) -> Option<Message> {
        let mut state = self.state.lock().expect("hub lock poisoned");
        for entry in &mut state.entries {
            let slot = entry.groups.entry(group.to_string()).or_default();
            if slot.acked || slot.owner.is_some() {
                continue;
            }
            slot.owner = Some(consumer.to_string());
            return Some(Message::new(entry.id.clone(), entry.fields.clone()));
        }
        None
    }
}

/// One consumer's view of a [`MemoryHub`].
pub struct MemoryLog {
    hub: Arc<MemoryHub>,
    group: String,
    consumer: String,
}

impl MemoryLog {
    /// Join `hub` as `consumer` within `group`.
    pub fn new(hub: Arc<MemoryHub>, group: impl Into<String>, consumer: impl Into<String>) -> Self {
        Self {
            hub,
            group: group.into(),
            consumer: consumer.into(),
        }
    }

    /// The shared hub backing this client.
    pub fn hub(&self) -> &Arc<MemoryHub> {
        &self.hub
    }
}

#[async_trait]
impl WorkQueue for MemoryLog {
    async fn ensure_group(&self) -> QueueResult<()> {
        let mut state = self.hub.state.lock().expect("hub lock poisoned");
        state.groups.insert(self.group.clone());
        Ok(())
    }

    async fn read_next(&self, blocking: bool) -> QueueResult<Option<Message>> {
        let mut rx = self.hub.subscribe();
        loop {
            if let Some(msg) = self.hub.claim_next(&self.group, &self.consumer) {
                return Ok(Some(msg));
            }
            if !blocking {
                return Ok(None);
            }
            if rx.changed().await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn acknowledge(&self, id: &MessageId) -> QueueResult<()> {
        let mut state = self.hub.state.lock().expect("hub lock poisoned");
        if let Some(entry) = state.entries.iter_mut().find(|e| &e.id == id) {
            let slot = entry.groups.entry(self.group.clone()).or_default();
            slot.acked = true;
        }
        Ok(())
    }

    async fn remove(&self, id: &MessageId) -> QueueResult<()> {
        let mut state = self.hub.state.lock().expect("hub lock poisoned");
        state.entries.retain(|e| &e.id != id);
        Ok(())
    }
}
