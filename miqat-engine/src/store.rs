//! Named plain-record storage shared by both execution contexts.

use crate::events::ChangeEvent;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;

/// A schema-less record: string keys to plain values. Instants survive only
/// as strings here; the codec reconstructs them.
pub type PlainRecord = Map<String, Value>;

/// Storage of named plain records with change notification.
///
/// The update discipline is whole-record overwrite. There are no
/// field-level writes, so readers never observe a partially updated record.
pub trait RecordStore: Send + Sync {
    fn get(&self, key: &str) -> Option<PlainRecord>;

    fn set(&self, key: &str, record: PlainRecord);

    /// Subscribes to change events naming the keys each write touched.
    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// In-process implementation of [`RecordStore`].
pub struct MemoryStore {
    records: RwLock<HashMap<String, PlainRecord>>,
    change_sender: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (change_sender, _) = broadcast::channel(16);
        Self {
            records: RwLock::new(HashMap::new()),
            change_sender,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &str) -> Option<PlainRecord> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, record: PlainRecord) {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), record);
        self.change_sender
            .send(ChangeEvent {
                keys: vec![key.to_string()],
            })
            .ok();
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.change_sender.subscribe()
    }
}
