//! Ordered action → combos mapping, its defaults and persistence

use std::fmt;

use dbdesk_storage::KeyValueStore;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use crate::combo::KeyCombo;

/// Versioned key of the persisted mapping
pub const STORAGE_KEY: &str = "dbdesk.shortcuts.v1";

/// Action ids and their combos, in insertion order. Dispatch scans in this
/// order, so the first entry wins when two actions share a combo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortcutMap {
    entries: Vec<(String, Vec<KeyCombo>)>,
}

impl ShortcutMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in mapping
    pub fn defaults() -> Self {
        let both = |key: &str| vec![KeyCombo::new(key).meta(), KeyCombo::new(key).ctrl()];

        let mut map = Self::new();
        map.insert("shortcuts.open-settings", both("K"));
        map.insert("mongo.run-query", both("Enter"));
        map.insert(
            "mongo.toggle-ai",
            vec![
                KeyCombo::new("A").meta().shift(),
                KeyCombo::new("A").ctrl().shift(),
            ],
        );
        map.insert("mongo.open-import", both("I"));
        map.insert("mongo.open-export", both("E"));
        map.insert("mongo.toggle-bulk", both("B"));
        map.insert("mongo.page-next", vec![KeyCombo::new("ArrowRight").alt()]);
        map.insert("mongo.page-prev", vec![KeyCombo::new("ArrowLeft").alt()]);
        map.insert("mongo.copy-doc", both("C"));
        map
    }

    pub fn get(&self, action: &str) -> Option<&[KeyCombo]> {
        self.entries
            .iter()
            .find(|(id, _)| id == action)
            .map(|(_, combos)| combos.as_slice())
    }

    /// Replace an action's combos, keeping its position; new actions go last
    pub fn insert(&mut self, action: impl Into<String>, combos: Vec<KeyCombo>) {
        let action = action.into();
        match self.entries.iter_mut().find(|(id, _)| *id == action) {
            Some((_, existing)) => *existing = combos,
            None => self.entries.push((action, combos)),
        }
    }

    /// Put `combo` at `index` of the action's list. An index past the end
    /// appends.
    pub fn set(&mut self, action: &str, combo: KeyCombo, index: usize) {
        let mut combos = self.get(action).map(<[KeyCombo]>::to_vec).unwrap_or_default();
        if index < combos.len() {
            combos[index] = combo;
        } else {
            combos.push(combo);
        }
        self.insert(action, combos);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[KeyCombo])> {
        self.entries
            .iter()
            .map(|(id, combos)| (id.as_str(), combos.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First action, in map order, with a combo matching `combo`
    pub fn find_action(&self, combo: &KeyCombo) -> Option<&str> {
        self.iter()
            .find(|(_, combos)| combos.iter().any(|c| c.equivalent(combo)))
            .map(|(id, _)| id)
    }

    /// Other actions already bound to `combo`
    pub fn conflicts(&self, action: &str, combo: &KeyCombo) -> Vec<String> {
        self.iter()
            .filter(|(id, _)| *id != action)
            .filter(|(_, combos)| combos.iter().any(|c| c.equivalent(combo)))
            .map(|(id, _)| id.to_string())
            .collect()
    }

    /// Overlay stored entries on the defaults. Stored actions replace the
    /// default combos; actions the defaults don't know are kept.
    pub fn merged_over_defaults(self) -> Self {
        let mut merged = Self::defaults();
        for (action, combos) in self.entries {
            merged.insert(action, combos);
        }
        merged
    }

    /// Read the persisted mapping merged over the defaults. Missing,
    /// unreadable or malformed storage yields the defaults.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let raw = match store.get(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::defaults(),
            Err(e) => {
                debug!("Shortcut storage unavailable: {}", e);
                return Self::defaults();
            }
        };

        match serde_json::from_str::<ShortcutMap>(&raw) {
            Ok(stored) => stored.merged_over_defaults(),
            Err(e) => {
                warn!("Ignoring malformed stored shortcuts: {}", e);
                Self::defaults()
            }
        }
    }

    /// Persist the full mapping. Failures are logged, never raised: the
    /// in-memory mapping stays authoritative.
    pub fn save(&self, store: &dyn KeyValueStore) {
        let result = serde_json::to_string(self)
            .map_err(anyhow::Error::from)
            .and_then(|json| store.set(STORAGE_KEY, &json).map_err(anyhow::Error::from));
        if let Err(e) = result {
            debug!("Shortcuts not persisted: {:#}", e);
        }
    }
}

impl Serialize for ShortcutMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (action, combos) in &self.entries {
            map.serialize_entry(action, combos)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ShortcutMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ShortcutMapVisitor;

        impl<'de> Visitor<'de> for ShortcutMapVisitor {
            type Value = ShortcutMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of action ids to key combo lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ShortcutMap, A::Error> {
                let mut map = ShortcutMap::new();
                while let Some((action, combos)) = access.next_entry::<String, Vec<KeyCombo>>()? {
                    map.insert(action, combos);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(ShortcutMapVisitor)
    }
}
