use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;

use crate::errors::StoreError;

/// Byte-string-to-byte-string map, one per shard. Reads take the shared
/// side of the lock; every write takes the exclusive side.
#[derive(Default)]
pub struct KvStore {
    inner: RwLock<HashMap<Bytes, Bytes>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditionally stores `val` under `key`. Never fails.
    pub fn set(&self, key: Bytes, val: Bytes) {
        self.inner.write().unwrap().insert(key, val);
    }

    /// Returns a copy of the stored value, if present.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.inner.read().unwrap().get(key).cloned()
    }

    /// Idempotent; absence is not an error.
    pub fn delete(&self, key: &[u8]) {
        self.inner.write().unwrap().remove(key);
    }

    /// Parses the stored value as a signed decimal integer, adds `n`, and
    /// re-stores the decimal serialization of the sum.
    pub fn add(&self, key: &[u8], n: i64) -> Result<(), StoreError> {
        let mut guard = self.inner.write().unwrap();
        let current = guard.get(key).ok_or(StoreError::NoSuchKey)?;
        let value: i64 = std::str::from_utf8(current)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(StoreError::NotInteger)?;
        let sum = value + n;
        guard.insert(Bytes::copy_from_slice(key), Bytes::from(sum.to_string()));
        Ok(())
    }
}
