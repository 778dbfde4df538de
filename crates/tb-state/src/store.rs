// store.rs — StateStore trait, JsonFileStore and MemoryStore implementations.
//
// The StateStore trait is the only I/O boundary in the engine: gates are
// pure functions over a snapshot, and everything they need to remember
// between evaluations flows through here.
//
// Design: each namespace gets its own JSON document (`<dir>/<ns>.json`)
// and its own lock. Gates own disjoint namespaces, so two concurrent
// evaluations only contend when they touch the same namespace, and a
// counter update via `update()` is atomic under that namespace's lock.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::warn;

use crate::entry::StateEntry;
use crate::error::StateError;

/// Trait for namespaced, TTL-scoped state persistence.
///
/// All methods take `&self`: implementations use interior locking so the
/// store can be shared across concurrent evaluations.
pub trait StateStore: Send + Sync {
    /// Read a value. Expired entries behave exactly like missing keys.
    fn get(&self, namespace: &str, key: &str) -> Option<Value>;

    /// Write a pre-built entry (used by `put` and by tests that need to
    /// control `written_at`).
    fn put_entry(&self, namespace: &str, key: &str, entry: StateEntry) -> Result<(), StateError>;

    /// Remove a key. Removing a missing key is not an error.
    fn delete(&self, namespace: &str, key: &str) -> Result<(), StateError>;

    /// Atomic read-modify-write under the namespace's lock.
    ///
    /// `f` receives the current (non-expired) value and returns the new
    /// one, or `None` to delete the key. Returns the value that was
    /// written. This is the only correct way to bump a counter.
    fn update(
        &self,
        namespace: &str,
        key: &str,
        ttl_seconds: Option<u64>,
        f: &mut dyn FnMut(Option<Value>) -> Option<Value>,
    ) -> Result<Option<Value>, StateError>;

    /// Write a value with the current timestamp.
    fn put(
        &self,
        namespace: &str,
        key: &str,
        value: Value,
        ttl_seconds: Option<u64>,
    ) -> Result<(), StateError> {
        self.put_entry(namespace, key, StateEntry::new(value, ttl_seconds))
    }
}

/// One namespace's in-memory view: the entry map plus its backing file.
struct Namespace {
    entries: HashMap<String, StateEntry>,
    path: PathBuf,
}

impl Namespace {
    /// Load a namespace from disk. Missing or corrupt files become an
    /// empty map: the store self-heals rather than failing the caller.
    fn load(path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str::<HashMap<String, StateEntry>>(&json) {
                Ok(map) => map,
                Err(err) => {
                    warn!(path = %path.display(), %err, "corrupt state file, treating as empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { entries, path }
    }

    /// Read a live value, dropping the entry from memory if it expired.
    fn get_live(&mut self, key: &str) -> Option<Value> {
        let now = chrono::Utc::now();
        if self.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            self.entries.remove(key);
        }
        self.entries.get(key).map(|e| e.value.clone())
    }

    /// Persist the namespace atomically (write temp file, then rename)
    /// so a concurrent reader never observes a torn document.
    fn persist(&mut self) -> Result<(), StateError> {
        let now = chrono::Utc::now();
        self.entries.retain(|_, e| !e.is_expired(now));

        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StateError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StateError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// File-backed store: one JSON document per namespace under a state
/// directory (typically `.tollbooth/state/`).
pub struct JsonFileStore {
    dir: PathBuf,
    namespaces: Mutex<HashMap<String, Arc<Mutex<Namespace>>>>,
}

impl JsonFileStore {
    /// Create a store backed by the given directory.
    /// Creates the directory if it doesn't exist.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StateError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StateError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            namespaces: Mutex::new(HashMap::new()),
        })
    }

    /// Fetch (loading on first touch) the handle for a namespace.
    fn namespace(&self, name: &str) -> Arc<Mutex<Namespace>> {
        let mut map = self.namespaces.lock().expect("namespace map poisoned");
        map.entry(name.to_string())
            .or_insert_with(|| {
                let path = self.dir.join(format!("{name}.json"));
                Arc::new(Mutex::new(Namespace::load(path)))
            })
            .clone()
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        let ns = self.namespace(namespace);
        let mut ns = ns.lock().expect("namespace poisoned");
        ns.get_live(key)
    }

    fn put_entry(&self, namespace: &str, key: &str, entry: StateEntry) -> Result<(), StateError> {
        let ns = self.namespace(namespace);
        let mut ns = ns.lock().expect("namespace poisoned");
        ns.entries.insert(key.to_string(), entry);
        ns.persist()
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<(), StateError> {
        let ns = self.namespace(namespace);
        let mut ns = ns.lock().expect("namespace poisoned");
        if ns.entries.remove(key).is_some() {
            ns.persist()?;
        }
        Ok(())
    }

    fn update(
        &self,
        namespace: &str,
        key: &str,
        ttl_seconds: Option<u64>,
        f: &mut dyn FnMut(Option<Value>) -> Option<Value>,
    ) -> Result<Option<Value>, StateError> {
        let ns = self.namespace(namespace);
        let mut ns = ns.lock().expect("namespace poisoned");
        let current = ns.get_live(key);
        let next = f(current);
        match &next {
            Some(value) => {
                ns.entries
                    .insert(key.to_string(), StateEntry::new(value.clone(), ttl_seconds));
            }
            None => {
                ns.entries.remove(key);
            }
        }
        ns.persist()?;
        Ok(next)
    }
}

/// In-memory store for unit tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    namespaces: Mutex<HashMap<String, HashMap<String, StateEntry>>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        let now = chrono::Utc::now();
        let mut map = self.namespaces.lock().expect("memory store poisoned");
        let ns = map.get_mut(namespace)?;
        if ns.get(key).is_some_and(|e| e.is_expired(now)) {
            ns.remove(key);
        }
        ns.get(key).map(|e| e.value.clone())
    }

    fn put_entry(&self, namespace: &str, key: &str, entry: StateEntry) -> Result<(), StateError> {
        let mut map = self.namespaces.lock().expect("memory store poisoned");
        map.entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<(), StateError> {
        let mut map = self.namespaces.lock().expect("memory store poisoned");
        if let Some(ns) = map.get_mut(namespace) {
            ns.remove(key);
        }
        Ok(())
    }

    fn update(
        &self,
        namespace: &str,
        key: &str,
        ttl_seconds: Option<u64>,
        f: &mut dyn FnMut(Option<Value>) -> Option<Value>,
    ) -> Result<Option<Value>, StateError> {
        let now = chrono::Utc::now();
        let mut map = self.namespaces.lock().expect("memory store poisoned");
        let ns = map.entry(namespace.to_string()).or_default();
        let current = ns
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value.clone());
        let next = f(current);
        match &next {
            Some(value) => {
                ns.insert(key.to_string(), StateEntry::new(value.clone(), ttl_seconds));
            }
            None => {
                ns.remove(key);
            }
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ns;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn put_and_get_round_trip() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state")).unwrap();

        store
            .put(ns::FLAGS, "flags", json!(["a", "b"]), None)
            .unwrap();
        assert_eq!(store.get(ns::FLAGS, "flags"), Some(json!(["a", "b"])));
    }

    #[test]
    fn get_missing_returns_none() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state")).unwrap();
        assert_eq!(store.get(ns::FLAGS, "nope"), None);
    }

    #[test]
    fn expired_entry_reads_as_absent() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state")).unwrap();

        let entry = StateEntry {
            value: json!("stale"),
            written_at: Utc::now() - Duration::seconds(300),
            ttl_seconds: Some(120),
        };
        store.put_entry(ns::CALL_HISTORY, "sig", entry).unwrap();

        // Must be indistinguishable from a missing key.
        assert_eq!(store.get(ns::CALL_HISTORY, "sig"), None);
    }

    #[test]
    fn unexpired_entry_still_readable() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state")).unwrap();

        store
            .put(ns::CALL_HISTORY, "sig", json!(1), Some(3600))
            .unwrap();
        assert_eq!(store.get(ns::CALL_HISTORY, "sig"), Some(json!(1)));
    }

    #[test]
    fn delete_removes_key() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state")).unwrap();

        store.put(ns::TASK_SCOPE, "current", json!({}), None).unwrap();
        store.delete(ns::TASK_SCOPE, "current").unwrap();
        assert_eq!(store.get(ns::TASK_SCOPE, "current"), None);
    }

    #[test]
    fn delete_missing_key_is_ok() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state")).unwrap();
        store.delete(ns::TASK_SCOPE, "ghost").unwrap();
    }

    #[test]
    fn update_increments_counter_atomically() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state")).unwrap();

        for _ in 0..3 {
            store
                .update(ns::PENDING_QUESTION, "violations", None, &mut |cur| {
                    let n = cur.and_then(|v| v.as_u64()).unwrap_or(0);
                    Some(json!(n + 1))
                })
                .unwrap();
        }
        assert_eq!(store.get(ns::PENDING_QUESTION, "violations"), Some(json!(3)));
    }

    #[test]
    fn update_returning_none_deletes() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state")).unwrap();

        store.put(ns::FLAGS, "k", json!(1), None).unwrap();
        let result = store
            .update(ns::FLAGS, "k", None, &mut |_| None)
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(store.get(ns::FLAGS, "k"), None);
    }

    #[test]
    fn corrupt_backing_file_self_heals() {
        let dir = tempdir().unwrap();
        let state_dir = dir.path().join("state");
        std::fs::create_dir_all(&state_dir).unwrap();
        std::fs::write(state_dir.join("flags.json"), "{not valid json!").unwrap();

        let store = JsonFileStore::new(&state_dir).unwrap();
        // Corrupt file reads as empty, and the store keeps working.
        assert_eq!(store.get(ns::FLAGS, "anything"), None);
        store.put(ns::FLAGS, "fresh", json!(true), None).unwrap();
        assert_eq!(store.get(ns::FLAGS, "fresh"), Some(json!(true)));
    }

    #[test]
    fn store_survives_reopen() {
        let dir = tempdir().unwrap();
        let state_dir = dir.path().join("state");

        {
            let store = JsonFileStore::new(&state_dir).unwrap();
            store
                .put(ns::PHASE_STATE, "current", json!("planning"), None)
                .unwrap();
        }
        {
            let store = JsonFileStore::new(&state_dir).unwrap();
            assert_eq!(
                store.get(ns::PHASE_STATE, "current"),
                Some(json!("planning"))
            );
        }
    }

    #[test]
    fn namespaces_are_disjoint() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state")).unwrap();

        store.put(ns::FLAGS, "k", json!("flags"), None).unwrap();
        store.put(ns::TASK_SCOPE, "k", json!("scope"), None).unwrap();

        assert_eq!(store.get(ns::FLAGS, "k"), Some(json!("flags")));
        assert_eq!(store.get(ns::TASK_SCOPE, "k"), Some(json!("scope")));
    }

    #[test]
    fn concurrent_updates_do_not_lose_increments() {
        use std::sync::Arc;

        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("state")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store
                            .update(ns::CALL_HISTORY, "waste", None, &mut |cur| {
                                let n = cur.and_then(|v| v.as_u64()).unwrap_or(0);
                                Some(json!(n + 1))
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.get(ns::CALL_HISTORY, "waste"), Some(json!(200)));
    }

    #[test]
    fn memory_store_matches_file_store_semantics() {
        let store = MemoryStore::new();

        store.put(ns::FLAGS, "k", json!(1), None).unwrap();
        assert_eq!(store.get(ns::FLAGS, "k"), Some(json!(1)));

        let entry = StateEntry {
            value: json!("old"),
            written_at: Utc::now() - Duration::seconds(10),
            ttl_seconds: Some(5),
        };
        store.put_entry(ns::FLAGS, "expired", entry).unwrap();
        assert_eq!(store.get(ns::FLAGS, "expired"), None);

        store.delete(ns::FLAGS, "k").unwrap();
        assert_eq!(store.get(ns::FLAGS, "k"), None);
    }
}
