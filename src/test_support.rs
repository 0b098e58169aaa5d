//! In-memory stand-ins for the browser collaborators, shared by unit tests
use crate::error::Result;
use crate::engine::Page;
use crate::motivation::Quote;
use crate::scheduler::WakeupSlots;
use crate::settings::EpochMillis;
use crate::sites::{Marker, MarkerTarget, ScrubRule};
use crate::storage::{SettingsPatch, StorageChange, StorageChanges, StorageSnapshot, StoredValues};
use std::collections::{BTreeMap, BTreeSet};

/// Key/value store that reports the same diffs `chrome.storage.onChanged` would
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: StoredValues,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn values(&self) -> &StoredValues {
        &self.values
    }

    pub fn snapshot(&self) -> StorageSnapshot {
        StorageSnapshot::from_values(&self.values)
    }

    /// Apply a batch and return the change notification for it
    pub fn set(&mut self, patch: &SettingsPatch) -> StorageChanges {
        let mut changes = StorageChanges::default();
        for (key, value) in patch.entries() {
            let old_value = self.values.insert(key.clone(), value.clone());
            if old_value.as_ref() != Some(value) {
                changes.insert(
                    key,
                    StorageChange {
                        old_value,
                        new_value: Some(value.clone()),
                    },
                );
            }
        }
        changes
    }
}

/// Named alarm slots driven by an explicit clock
#[derive(Debug, Default)]
pub struct ManualAlarms {
    slots: BTreeMap<String, EpochMillis>,
    pub armed_count: usize,
}

impl ManualAlarms {
    pub fn scheduled(&self, name: &str) -> Option<EpochMillis> {
        self.slots.get(name).copied()
    }

    /// Remove and return every alarm due at `now`
    pub fn due(&mut self, now: EpochMillis) -> Vec<String> {
        let due: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(name, _)| name.clone())
            .collect();
        for name in &due {
            self.slots.remove(name);
        }
        due
    }
}

impl WakeupSlots for ManualAlarms {
    fn arm(&mut self, name: &str, at: EpochMillis) {
        self.armed_count += 1;
        self.slots.insert(name.to_string(), at);
    }

    fn disarm(&mut self, name: &str) {
        self.slots.remove(name);
    }
}

/// Page double that records every DOM effect
#[derive(Debug, Default)]
pub struct MemoryPage {
    pub href: String,
    pub attributes: BTreeSet<&'static str>,
    pub classes: BTreeSet<&'static str>,
    pub quotes: Vec<(Quote, String)>,
    pub scrub_passes: Vec<String>,
    pub unscrub_passes: Vec<String>,
    pub redirects: Vec<String>,
    /// When set, `replace_location` also updates `href`
    pub follow_redirects: bool,
}

impl MemoryPage {
    pub fn at(href: &str) -> Self {
        MemoryPage {
            href: href.to_string(),
            ..MemoryPage::default()
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains(name) || self.classes.contains(name)
    }
}

impl Page for MemoryPage {
    fn href(&self) -> String {
        self.href.clone()
    }

    fn set_marker(&mut self, marker: &Marker, active: bool) {
        let set = match marker.target {
            MarkerTarget::RootAttribute => &mut self.attributes,
            MarkerTarget::BodyClass => &mut self.classes,
        };
        if active {
            set.insert(marker.name);
        } else {
            set.remove(marker.name);
        }
    }

    fn has_quote(&self) -> bool {
        !self.quotes.is_empty()
    }

    fn insert_quote(&mut self, quote: &Quote, anchor: &str) {
        self.quotes.push((*quote, anchor.to_string()));
    }

    fn remove_quote(&mut self) {
        self.quotes.clear();
    }

    fn scrub(&mut self, rule: &ScrubRule) -> usize {
        self.scrub_passes.push(rule.selector());
        0
    }

    fn unscrub(&mut self, rule: &ScrubRule) -> usize {
        self.unscrub_passes.push(rule.selector());
        0
    }

    fn replace_location(&mut self, url: &str) -> Result<()> {
        self.redirects.push(url.to_string());
        if self.follow_redirects {
            self.href = url.to_string();
        }
        Ok(())
    }
}
