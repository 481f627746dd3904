use std::collections::HashMap;
use uuid::Uuid;

/// Resolution state of one cached key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Pending,
    Resolved(Uuid),
    /// The key cannot name an entity (empty path or name).
    Unresolvable,
}

impl Resolution {
    pub fn id(self) -> Option<Uuid> {
        match self {
            Resolution::Resolved(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationEntry {
    pub key: String,
    pub name_path: String,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEntry {
    pub key: String,
    pub resolution: Resolution,
}

/// Run-scoped deduplication of location and item keys.
///
/// Entries keep their first-seen order. Once an entry leaves `Pending` it is
/// never changed again, so each key is resolved at most once per run.
#[derive(Debug, Default)]
pub struct BatchEntityCache {
    locations: Vec<LocationEntry>,
    location_index: HashMap<String, usize>,
    items: Vec<ItemEntry>,
    item_index: HashMap<String, usize>,
    pending_locations: Vec<usize>,
    pending_items: Vec<usize>,
}

impl BatchEntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the key was not cached yet.
    pub fn insert_location(&mut self, key: &str, name_path: &str) -> bool {
        if self.location_index.contains_key(key) {
            return false;
        }
        let idx = self.locations.len();
        self.locations.push(LocationEntry {
            key: key.to_string(),
            name_path: name_path.to_string(),
            resolution: Resolution::Pending,
        });
        self.location_index.insert(key.to_string(), idx);
        self.pending_locations.push(idx);
        true
    }

    /// Returns true when the key was not cached yet.
    pub fn insert_item(&mut self, key: &str) -> bool {
        if self.item_index.contains_key(key) {
            return false;
        }
        let idx = self.items.len();
        self.items.push(ItemEntry {
            key: key.to_string(),
            resolution: Resolution::Pending,
        });
        self.item_index.insert(key.to_string(), idx);
        self.pending_items.push(idx);
        true
    }

    pub fn location(&self, key: &str) -> Option<&LocationEntry> {
        self.location_index.get(key).map(|&idx| &self.locations[idx])
    }

    pub fn item(&self, key: &str) -> Option<&ItemEntry> {
        self.item_index.get(key).map(|&idx| &self.items[idx])
    }

    pub fn location_id(&self, key: &str) -> Option<Uuid> {
        self.location(key).and_then(|e| e.resolution.id())
    }

    pub fn item_id(&self, key: &str) -> Option<Uuid> {
        self.item(key).and_then(|e| e.resolution.id())
    }

    /// Location entries still waiting for resolution, oldest first.
    pub fn take_pending_locations(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.pending_locations)
            .into_iter()
            .map(|idx| {
                let entry = &self.locations[idx];
                (entry.key.clone(), entry.name_path.clone())
            })
            .collect()
    }

    /// Item keys still waiting for resolution, oldest first.
    pub fn take_pending_items(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_items)
            .into_iter()
            .map(|idx| self.items[idx].key.clone())
            .collect()
    }

    /// Settles a pending location. Settled entries are left as they are.
    pub fn settle_location(&mut self, key: &str, resolution: Resolution) {
        if let Some(&idx) = self.location_index.get(key) {
            let entry = &mut self.locations[idx];
            if entry.resolution == Resolution::Pending {
                entry.resolution = resolution;
            }
        }
    }

    /// Settles a pending item. Settled entries are left as they are.
    pub fn settle_item(&mut self, key: &str, resolution: Resolution) {
        if let Some(&idx) = self.item_index.get(key) {
            let entry = &mut self.items[idx];
            if entry.resolution == Resolution::Pending {
                entry.resolution = resolution;
            }
        }
    }

    /// Identities of every resolved location, in first-seen order.
    pub fn resolved_location_ids(&self) -> Vec<Uuid> {
        self.locations.iter().filter_map(|e| e.resolution.id()).collect()
    }

    /// Identities of every resolved item, in first-seen order.
    pub fn resolved_item_ids(&self) -> Vec<Uuid> {
        self.items.iter().filter_map(|e| e.resolution.id()).collect()
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
