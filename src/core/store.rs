use std::collections::HashMap;
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Serialize};
use spin_sdk::key_value::Store;

/// JSON key-value storage the application runs on.
///
/// On wasm32 this is the Spin key-value store; the native host and the tests
/// use [`MemoryStore`]. List-valued keys (feed, edge lists, indexes) are only
/// mutated through [`KvStore::update_json`], and unique claims go through
/// [`KvStore::insert_if_absent`].
pub trait KvStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>>;
    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// Read-modify-write of one key; a missing key starts from `T::default()`.
    /// The closure must not touch the store.
    fn update_json<T, R, F>(&self, key: &str, f: F) -> anyhow::Result<R>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T) -> R;

    /// Sets `key` only when it is absent. Returns whether this call won.
    fn insert_if_absent<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<bool>;
}

impl KvStore for Store {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        Store::get_json(self, key)
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        Store::set_json(self, key, value)
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        Store::delete(self, key)?;
        Ok(())
    }

    // The Spin store has no transactions: each component instance serves one
    // request, and concurrent instances resolve last-write-wins.
    fn update_json<T, R, F>(&self, key: &str, f: F) -> anyhow::Result<R>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T) -> R,
    {
        let mut value: T = Store::get_json(self, key)?.unwrap_or_default();
        let out = f(&mut value);
        Store::set_json(self, key, &value)?;
        Ok(out)
    }

    fn insert_if_absent<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<bool> {
        if Store::exists(self, key)? {
            return Ok(false);
        }
        Store::set_json(self, key, value)?;
        Ok(true)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> anyhow::Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl KvStore for MemoryStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.entries()?.get(key) {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.entries()?.insert(key.to_string(), bytes);
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }

    fn update_json<T, R, F>(&self, key: &str, f: F) -> anyhow::Result<R>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T) -> R,
    {
        // Lock held across read, mutate and write
        let mut entries = self.entries()?;
        let mut value: T = match entries.get(key) {
            Some(bytes) => serde_json::from_slice(bytes)?,
            None => T::default(),
        };
        let out = f(&mut value);
        entries.insert(key.to_string(), serde_json::to_vec(&value)?);
        Ok(out)
    }

    fn insert_if_absent<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<bool> {
        let mut entries = self.entries()?;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), serde_json::to_vec(value)?);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_and_deletes() {
        let store = MemoryStore::new();
        assert_eq!(store.get_json::<Vec<String>>("feed").unwrap(), None);

        store.set_json("feed", &vec!["a".to_string()]).unwrap();
        assert_eq!(
            store.get_json::<Vec<String>>("feed").unwrap(),
            Some(vec!["a".to_string()])
        );

        store.delete("feed").unwrap();
        store.delete("feed").unwrap();
        assert_eq!(store.get_json::<Vec<String>>("feed").unwrap(), None);
    }

    #[test]
    fn update_json_starts_from_default_and_returns_closure_value() {
        let store = MemoryStore::new();
        let len = store
            .update_json("feed", |feed: &mut Vec<String>| {
                feed.push("a".to_string());
                feed.len()
            })
            .unwrap();
        assert_eq!(len, 1);
        assert_eq!(
            store.get_json::<Vec<String>>("feed").unwrap(),
            Some(vec!["a".to_string()])
        );
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let store = MemoryStore::new();
        std::thread::scope(|s| {
            for t in 0..8 {
                let store = &store;
                s.spawn(move || {
                    for i in 0..200 {
                        store
                            .update_json("feed", |feed: &mut Vec<String>| {
                                feed.insert(0, format!("{}-{}", t, i))
                            })
                            .unwrap();
                    }
                });
            }
        });
        let feed: Vec<String> = store.get_json("feed").unwrap().unwrap();
        assert_eq!(feed.len(), 1600);
    }

    #[test]
    fn insert_if_absent_has_one_winner() {
        let store = MemoryStore::new();
        let wins = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|t| {
                    let store = &store;
                    s.spawn(move || store.insert_if_absent("username:bob", &format!("id-{}", t)).unwrap())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count()
        });
        assert_eq!(wins, 1);
        assert!(!store.insert_if_absent("username:bob", &"late").unwrap());
    }
}
