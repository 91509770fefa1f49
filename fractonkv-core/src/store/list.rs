use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use bytes::Bytes;

use crate::errors::StoreError;

/// Byte-string-to-ordered-sequence map, one per shard. A single exclusive
/// mutex covers every operation — there is no read/write split here,
/// unlike `KvStore`, because `get_l` must hand back a snapshot consistent
/// with any concurrent push.
#[derive(Default)]
pub struct ListStore {
    inner: Mutex<HashMap<Bytes, VecDeque<Bytes>>>,
}

impl ListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `val` at the tail, creating the sequence if absent. Never
    /// fails.
    pub fn push(&self, key: Bytes, val: Bytes) {
        self.inner.lock().unwrap().entry(key).or_default().push_back(val);
    }

    /// Copy-on-read snapshot of the current sequence.
    pub fn get(&self, key: &[u8]) -> Result<Vec<Bytes>, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .get(key)
            .map(|seq| seq.iter().cloned().collect())
            .ok_or(StoreError::NoSuchKey)
    }

    /// Total: presence check, never fails.
    pub fn has(&self, key: &[u8]) -> bool {
        self.inner.lock().unwrap().contains_key(key)
    }

    /// Removes the entire sequence; idempotent.
    pub fn delete(&self, key: &[u8]) {
        self.inner.lock().unwrap().remove(key);
    }

    /// Removes the first occurrence of `val`, searched head-to-tail. A
    /// miss on the element is not an error. Collapses the key if the
    /// sequence becomes empty.
    pub fn del_elem(&self, key: &[u8], val: &[u8]) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let empty = {
            let seq = guard.get_mut(key).ok_or(StoreError::NoSuchKey)?;
            if let Some(pos) = seq.iter().position(|elem| elem.as_ref() == val) {
                seq.remove(pos);
            }
            seq.is_empty()
        };
        if empty {
            guard.remove(key);
        }
        Ok(())
    }

    /// Removes every occurrence of `val`. Collapses the key if the
    /// sequence becomes empty.
    pub fn del_all(&self, key: &[u8], val: &[u8]) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap();
        let empty = {
            let seq = guard.get_mut(key).ok_or(StoreError::NoSuchKey)?;
            seq.retain(|elem| elem.as_ref() != val);
            seq.is_empty()
        };
        if empty {
            guard.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let store = ListStore::new();
        store.push(Bytes::from_static(b"L"), Bytes::from_static(b"a"));
        store.push(Bytes::from_static(b"L"), Bytes::from_static(b"b"));
        store.push(Bytes::from_static(b"L"), Bytes::from_static(b"a"));
        assert_eq!(
            store.get(b"L").unwrap(),
            vec![Bytes::from_static(b"a"), Bytes::from_static(b"b"), Bytes::from_static(b"a")]
        );
    }

    #[test]
    fn get_on_missing_key_fails() {
        let store = ListStore::new();
        assert_eq!(store.get(b"nope"), Err(StoreError::NoSuchKey));
    }

    #[test]
    fn del_elem_removes_only_first_occurrence() {
        let store = ListStore::new();
        for v in [b"a".as_ref(), b"b", b"a"] {
            store.push(Bytes::from_static(b"L"), Bytes::copy_from_slice(v));
        }
        store.del_elem(b"L", b"a").unwrap();
        assert_eq!(store.get(b"L").unwrap(), vec![Bytes::from_static(b"b"), Bytes::from_static(b"a")]);
    }

    #[test]
    fn del_elem_miss_is_not_an_error() {
        let store = ListStore::new();
        store.push(Bytes::from_static(b"L"), Bytes::from_static(b"a"));
        store.del_elem(b"L", b"zzz").unwrap();
        assert_eq!(store.get(b"L").unwrap(), vec![Bytes::from_static(b"a")]);
    }

    #[test]
    fn del_elem_fails_on_missing_key() {
        let store = ListStore::new();
        assert_eq!(store.del_elem(b"nope", b"a"), Err(StoreError::NoSuchKey));
    }

    #[test]
    fn removing_last_element_collapses_the_key() {
        let store = ListStore::new();
        store.push(Bytes::from_static(b"L"), Bytes::from_static(b"a"));
        store.del_elem(b"L", b"a").unwrap();
        assert!(!store.has(b"L"));
    }

    #[test]
    fn del_all_removes_every_occurrence() {
        let store = ListStore::new();
        for v in [b"a".as_ref(), b"b", b"a", b"a"] {
            store.push(Bytes::from_static(b"L"), Bytes::copy_from_slice(v));
        }
        store.del_all(b"L", b"a").unwrap();
        assert_eq!(store.get(b"L").unwrap(), vec![Bytes::from_static(b"b")]);
    }

    #[test]
    fn del_all_collapses_key_when_all_removed() {
        let store = ListStore::new();
        store.push(Bytes::from_static(b"L"), Bytes::from_static(b"a"));
        store.push(Bytes::from_static(b"L"), Bytes::from_static(b"a"));
        store.del_all(b"L", b"a").unwrap();
        assert!(!store.has(b"L"));
    }
}
