/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Navigation state persistence.
//!
//! Values are read once at startup into a cache. Writes update the cache and
//! are handed to a write-behind worker thread; callers never wait on the
//! backing store. Failures are logged and otherwise ignored.

pub mod types;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, unbounded};
use log::warn;
use parking_lot::Mutex;
use redb::{ReadableDatabase, ReadableTable};

use crate::model::taxonomy::{TaxonomyModel, TaxonomyPath};
pub use types::{PersistedNavState, PreSearchSnapshot};
use types::{
    ALL_KEYS, KEY_ACTIVE_KEY, KEY_ACTIVE_PATH, KEY_PRE_SEARCH, KEY_SEARCH_OPEN_BRANCHES,
    KEY_SIDEBAR_COLLAPSED, SEARCH_KEYS, encode_flag,
};

const NAV_STATE_TABLE: redb::TableDefinition<&str, &str> = redb::TableDefinition::new("nav_state");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    Io(String),
    Redb(String),
    Encode(String),
    WorkerGone,
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::Io(e) => write!(f, "IO error: {e}"),
            PersistenceError::Redb(e) => write!(f, "Redb error: {e}"),
            PersistenceError::Encode(e) => write!(f, "Encode error: {e}"),
            PersistenceError::WorkerGone => write!(f, "Persistence worker is not running"),
        }
    }
}

impl std::error::Error for PersistenceError {}

/// String key/value backend. Implementations are moved onto the write-behind
/// worker, hence `Send`.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;
    fn keys(&self) -> Result<Vec<String>, PersistenceError>;
}

/// In-process store. Clones share the same map, so a test can keep a handle
/// and inspect what the worker wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        store.values.lock().extend(
            values
                .into_iter()
                .map(|(key, value)| (key.into(), value.into())),
        );
        store
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.values.lock().clone()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.values.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, PersistenceError> {
        Ok(self.values.lock().keys().cloned().collect())
    }
}

/// Durable store: a single redb table of string keys to string values.
pub struct RedbStore {
    db: redb::Database,
}

impl RedbStore {
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| PersistenceError::Io(format!("Failed to create dir: {e}")))?;
        }
        let db = redb::Database::create(path)
            .map_err(|e| PersistenceError::Redb(format!("Failed to open redb: {e}")))?;

        // Create the table up front so reads on a fresh file see an empty table.
        let write_txn = db
            .begin_write()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        {
            write_txn
                .open_table(NAV_STATE_TABLE)
                .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        }
        write_txn
            .commit()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;

        Ok(Self { db })
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        let table = read_txn
            .open_table(NAV_STATE_TABLE)
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        let entry = table
            .get(key)
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        Ok(entry.map(|value| value.value().to_string()))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        {
            let mut table = write_txn
                .open_table(NAV_STATE_TABLE)
                .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
            table
                .insert(key, value)
                .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        }
        write_txn
            .commit()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        {
            let mut table = write_txn
                .open_table(NAV_STATE_TABLE)
                .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
            let _ = table
                .remove(key)
                .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        }
        write_txn
            .commit()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))
    }

    fn keys(&self) -> Result<Vec<String>, PersistenceError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        let table = read_txn
            .open_table(NAV_STATE_TABLE)
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        let iter = table
            .iter()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        let mut keys = Vec::new();
        for entry in iter {
            let (key, _) = entry.map_err(|e| PersistenceError::Redb(format!("{e}")))?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }
}

enum WriteOp {
    Set { key: &'static str, value: String },
    Remove { key: &'static str },
    Flush(Sender<()>),
}

pub struct PersistenceAdapter {
    cache: BTreeMap<String, String>,
    startup: PersistedNavState,
    tx: Option<Sender<WriteOp>>,
    worker: Option<JoinHandle<()>>,
}

impl PersistenceAdapter {
    /// Read every known key once, then move the store onto the worker thread.
    pub fn open(
        store: Box<dyn KeyValueStore>,
        taxonomy: &TaxonomyModel,
    ) -> Result<Self, PersistenceError> {
        let mut cache = BTreeMap::new();
        for key in ALL_KEYS {
            match store.get(key) {
                Ok(Some(value)) => {
                    cache.insert(key.to_string(), value);
                },
                Ok(None) => {},
                Err(error) => warn!("Failed to read persisted '{key}': {error}"),
            }
        }
        let startup = PersistedNavState::from_raw(&cache, taxonomy);

        let (tx, rx) = unbounded::<WriteOp>();
        let worker = std::thread::Builder::new()
            .name("nav-persistence".to_string())
            .spawn(move || {
                let mut store = store;
                for op in rx {
                    let result = match op {
                        WriteOp::Set { key, value } => store.set(key, &value),
                        WriteOp::Remove { key } => store.remove(key),
                        WriteOp::Flush(ack) => {
                            let _ = ack.send(());
                            Ok(())
                        },
                    };
                    if let Err(error) = result {
                        warn!("Persisted navigation write failed: {error}");
                    }
                }
            })
            .map_err(|e| PersistenceError::Io(format!("Failed to spawn worker: {e}")))?;

        Ok(Self {
            cache,
            startup,
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    pub fn in_memory(taxonomy: &TaxonomyModel) -> Result<Self, PersistenceError> {
        Self::open(Box::new(MemoryStore::new()), taxonomy)
    }

    /// State as it was read at startup, already validated against the taxonomy.
    pub fn startup_state(&self) -> &PersistedNavState {
        &self.startup
    }

    pub fn cached(&self, key: &str) -> Option<&str> {
        self.cache.get(key).map(String::as_str)
    }

    pub fn save_active(&mut self, path: Option<&TaxonomyPath>, resolved_key: &str) {
        match path {
            Some(path) => {
                self.write(KEY_ACTIVE_PATH, path.as_str().to_string());
                self.write(KEY_ACTIVE_KEY, resolved_key.to_string());
            },
            None => {
                self.erase(KEY_ACTIVE_PATH);
                self.write(KEY_ACTIVE_KEY, resolved_key.to_string());
            },
        }
    }

    pub fn save_sidebar_collapsed(&mut self, collapsed: bool) {
        self.write(KEY_SIDEBAR_COLLAPSED, encode_flag(collapsed).to_string());
    }

    pub fn save_search_open_branches(&mut self, branches: &BTreeSet<String>) {
        match serde_json::to_string(branches) {
            Ok(value) => self.write(KEY_SEARCH_OPEN_BRANCHES, value),
            Err(error) => warn!("{}", PersistenceError::Encode(format!("{error}"))),
        }
    }

    pub fn save_pre_search(&mut self, snapshot: &PreSearchSnapshot) {
        match serde_json::to_string(snapshot) {
            Ok(value) => self.write(KEY_PRE_SEARCH, value),
            Err(error) => warn!("{}", PersistenceError::Encode(format!("{error}"))),
        }
    }

    pub fn clear_search_keys(&mut self) {
        for key in SEARCH_KEYS {
            self.erase(key);
        }
    }

    /// Block until every write queued so far has reached the store.
    pub fn flush(&self) -> Result<(), PersistenceError> {
        let tx = self.tx.as_ref().ok_or(PersistenceError::WorkerGone)?;
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        tx.send(WriteOp::Flush(ack_tx))
            .map_err(|_| PersistenceError::WorkerGone)?;
        ack_rx.recv().map_err(|_| PersistenceError::WorkerGone)
    }

    fn write(&mut self, key: &'static str, value: String) {
        if self.cache.get(key) == Some(&value) {
            return;
        }
        self.cache.insert(key.to_string(), value.clone());
        self.send(WriteOp::Set { key, value });
    }

    fn erase(&mut self, key: &'static str) {
        if self.cache.remove(key).is_some() {
            self.send(WriteOp::Remove { key });
        }
    }

    fn send(&self, op: WriteOp) {
        let Some(tx) = self.tx.as_ref() else {
            return;
        };
        if tx.send(op).is_err() {
            warn!("Persistence worker stopped; dropping navigation write");
        }
    }
}

impl Drop for PersistenceAdapter {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
