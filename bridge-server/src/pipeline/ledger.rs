//! Idempotency ledger
//!
//! Remembers a content hash per project so redelivered notifications
//! with unchanged payloads are dropped instead of reprocessed. Volatile
//! timestamp keys are stripped before hashing, so a notification that
//! differs only in `observedAt` counts as unchanged.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Keys excluded from the content hash
const VOLATILE_KEYS: [&str; 4] = ["observedAt", "createdAt", "updatedAt", "modifiedAt"];

const DEFAULT_CAPACITY: usize = 10_000;

struct LedgerEntry {
    hash: String,
    recorded_at: i64,
    outcome: Value,
}

/// In-memory dedup store keyed by `{kind}:{id}`
///
/// Process-local by design: a restart clears it, and reprocessing is
/// safe because entity writes are deterministic upserts.
pub struct IdempotencyLedger {
    entries: Mutex<HashMap<String, LedgerEntry>>,
    capacity: usize,
}

impl Default for IdempotencyLedger {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl IdempotencyLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Whether this payload differs from the last processed one
    pub fn should_process(&self, key: &str, payload: &Value) -> bool {
        let hash = content_hash(payload);
        let entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) => entry.hash != hash,
            None => true,
        }
    }

    /// Record a processed payload and its outcome, evicting the oldest
    /// tenth when full
    pub fn mark_processed(&self, key: &str, payload: &Value, outcome: Value) {
        let hash = content_hash(payload);
        let mut entries = self.entries.lock();

        if !entries.contains_key(key) && entries.len() >= self.capacity {
            let evict = (self.capacity / 10).max(1);
            let mut by_age: Vec<(String, i64)> = entries
                .iter()
                .map(|(k, e)| (k.clone(), e.recorded_at))
                .collect();
            by_age.sort_by(|a, b| (a.1, &a.0).cmp(&(b.1, &b.0)));
            for (key, _) in by_age.into_iter().take(evict) {
                entries.remove(&key);
            }
            tracing::debug!(evicted = evict, "idempotency ledger evicted oldest entries");
        }

        entries.insert(
            key.to_string(),
            LedgerEntry {
                hash,
                recorded_at: shared::util::now_millis(),
                outcome,
            },
        );
    }

    /// Outcome recorded with the last processed payload for this key
    pub fn recorded_outcome(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).map(|e| e.outcome.clone())
    }

    /// Forget one key; returns whether it was present
    pub fn clear(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    pub fn clear_all(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// sha256 over the canonical form, truncated to 16 hex chars
fn content_hash(payload: &Value) -> String {
    let canonical = canonicalize(payload);
    let digest = Sha256::digest(canonical.to_string().as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// Sort object keys and strip volatile keys, recursively
///
/// `Value::to_string` on the result is deterministic because maps
/// deserialized into `serde_json::Map` iterate in insertion order and
/// we rebuild them from sorted keys.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map
                .keys()
                .filter(|k| !VOLATILE_KEYS.contains(&k.as_str()))
                .collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|k| (k.clone(), canonicalize(&map[k])))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
