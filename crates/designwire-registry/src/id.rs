use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};

/// Bidirectional mapping from host object handles to dense wire ids.
///
/// Keys are opaque identities (handles), never compared by content. Ids are
/// assigned lowest-free-first: a freed id is handed to the next `add`, and
/// trailing free slots are trimmed, so live ids stay within `0..slot_count`
/// and are exactly `0..len` whenever no holes remain.
///
/// An id is only meaningful while its entry is live; do not cache it past
/// [`remove`](Self::remove).
#[derive(Debug)]
pub struct IdRegistry<K, V> {
    slots: Vec<Option<(K, V)>>,
    ids: HashMap<K, u16>,
    free: BTreeSet<u16>,
    config: RegistryConfig,
    cascading: bool,
}

impl<K, V> IdRegistry<K, V>
where
    K: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            slots: Vec::new(),
            ids: HashMap::new(),
            free: BTreeSet::new(),
            config: config.clamped(),
            cascading: false,
        }
    }

    /// Mark this registry as owning dependents that must be cleared when it
    /// becomes empty.
    pub fn cascading(mut self) -> Self {
        self.cascading = true;
        self
    }

    pub fn is_cascading(&self) -> bool {
        self.cascading
    }

    /// Register `key`, returning its new id.
    pub fn add(&mut self, key: K, value: V) -> Result<u16> {
        if self.ids.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered(format!("{key:?}")));
        }
        if self.ids.len() >= self.config.max_entries {
            return Err(RegistryError::Full {
                max: self.config.max_entries,
            });
        }

        let id = match self.free.pop_first() {
            Some(id) => {
                self.slots[usize::from(id)] = Some((key, value));
                id
            }
            None => {
                let id = u16::try_from(self.slots.len()).map_err(|_| RegistryError::Full {
                    max: self.config.max_entries,
                })?;
                self.slots.push(Some((key, value)));
                id
            }
        };
        self.ids.insert(key, id);
        Ok(id)
    }

    pub fn id_of(&self, key: &K) -> Result<u16> {
        self.ids
            .get(key)
            .copied()
            .ok_or_else(|| RegistryError::UnknownKey(format!("{key:?}")))
    }

    pub fn element_of(&self, id: u16) -> Result<K> {
        self.entry(id).map(|(key, _)| *key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.ids.contains_key(key)
    }

    pub fn info(&self, key: &K) -> Option<&V> {
        let id = *self.ids.get(key)?;
        self.entry(id).ok().map(|(_, value)| value)
    }

    pub fn info_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = *self.ids.get(key)?;
        self.slots
            .get_mut(usize::from(id))
            .and_then(Option::as_mut)
            .map(|(_, value)| value)
    }

    /// Remove one entry, freeing its id.
    pub fn remove(&mut self, key: &K) -> Option<(u16, V)> {
        let id = self.ids.remove(key)?;
        let (_, value) = self.slots[usize::from(id)].take()?;
        self.free.insert(id);
        self.trim();
        Some((id, value))
    }

    /// Keep only the entries `keep` accepts.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) {
        let doomed: Vec<K> = self
            .iter()
            .filter(|(_, key, value)| !keep(*key, *value))
            .map(|(_, key, _)| *key)
            .collect();
        for key in doomed {
            self.remove(&key);
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.ids.clear();
        self.free.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Live entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &K, &V)> + '_ {
        self.slots.iter().enumerate().filter_map(|(id, slot)| {
            slot.as_ref()
                .map(|(key, value)| (id as u16, key, value))
        })
    }

    fn entry(&self, id: u16) -> Result<&(K, V)> {
        self.slots
            .get(usize::from(id))
            .and_then(Option::as_ref)
            .ok_or(RegistryError::UnknownId(id))
    }

    fn trim(&mut self) {
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
            self.free.remove(&(self.slots.len() as u16));
        }
    }
}

impl<K, V> Default for IdRegistry<K, V>
where
    K: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
