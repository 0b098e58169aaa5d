//! Storage serialization utilities for chrome.storage.local

use crate::settings::{EpochMillis, REENABLE_AT_KEY, SettingKey, Settings};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Raw key/value map as returned by `chrome.storage.local.get`
pub type StoredValues = serde_json::Map<String, Value>;

/// Typed view of a store read. Absent keys and values of the wrong type are
/// both reported as missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StorageSnapshot {
    flags: BTreeMap<SettingKey, bool>,
    reenable_at: Option<EpochMillis>,
}

impl StorageSnapshot {
    pub fn from_values(values: &StoredValues) -> Self {
        let flags = SettingKey::ALL
            .into_iter()
            .filter_map(|key| {
                values
                    .get(key.storage_key())
                    .and_then(Value::as_bool)
                    .map(|value| (key, value))
            })
            .collect();

        StorageSnapshot {
            flags,
            reenable_at: values.get(REENABLE_AT_KEY).and_then(timestamp),
        }
    }

    pub fn flag(&self, key: SettingKey) -> Option<bool> {
        self.flags.get(&key).copied()
    }

    pub fn reenable_at(&self) -> Option<EpochMillis> {
        self.reenable_at
    }

    /// Overlay stored flags for `keys` onto `defaults`
    pub fn settings_or(&self, defaults: Settings, keys: &[SettingKey]) -> Settings {
        let mut settings = defaults;
        for &key in keys {
            if let Some(value) = self.flag(key) {
                settings.set(key, value);
            }
        }
        settings
    }
}

fn timestamp(value: &Value) -> Option<EpochMillis> {
    value
        .as_f64()
        .filter(|millis| millis.is_finite())
        .map(|millis| millis as EpochMillis)
}

/// One entry of a `chrome.storage.onChanged` payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    #[serde(default)]
    pub old_value: Option<Value>,
    #[serde(default)]
    pub new_value: Option<Value>,
}

/// A full `chrome.storage.onChanged` payload keyed by storage name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageChanges(pub BTreeMap<String, StorageChange>);

impl StorageChanges {
    pub fn insert(&mut self, key: &str, change: StorageChange) {
        self.0.insert(key.to_string(), change);
    }

    /// Known flags touched by this change. `None` means the key was removed
    /// or now holds something that is not a boolean.
    pub fn flag_changes(&self) -> impl Iterator<Item = (SettingKey, Option<bool>)> + '_ {
        self.0.iter().filter_map(|(name, change)| {
            SettingKey::from_storage_key(name)
                .map(|key| (key, change.new_value.as_ref().and_then(Value::as_bool)))
        })
    }

    /// `Some(None)` when the re-enable timestamp was cleared, `Some(Some(t))`
    /// when it was set, `None` when it was not touched.
    pub fn reenable_at_change(&self) -> Option<Option<EpochMillis>> {
        self.0
            .get(REENABLE_AT_KEY)
            .map(|change| change.new_value.as_ref().and_then(timestamp))
    }
}

/// A batch of values written with a single `chrome.storage.local.set`
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct SettingsPatch(BTreeMap<String, Value>);

impl SettingsPatch {
    pub fn new() -> Self {
        SettingsPatch(BTreeMap::new())
    }

    pub fn flag(mut self, key: SettingKey, value: bool) -> Self {
        self.0.insert(key.storage_key().to_string(), Value::Bool(value));
        self
    }

    /// `None` clears the timestamp by writing an explicit `null`
    pub fn reenable_at(mut self, at: Option<EpochMillis>) -> Self {
        let value = at.map_or(Value::Null, Value::from);
        self.0.insert(REENABLE_AT_KEY.to_string(), value);
        self
    }

    /// The batch that turns shorts blocking back on and drops any snooze
    pub fn reenable_shorts() -> Self {
        SettingsPatch::new()
            .flag(SettingKey::BlockShorts, true)
            .reenable_at(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(raw: Value) -> StoredValues {
        match raw {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_snapshot_reads_known_keys() {
        let snapshot = StorageSnapshot::from_values(&values(json!({
            "global_blockShorts": false,
            "global_blockFeed": true,
            "shortsReenableAt": 1_700_000_180_000i64,
            "unrelated": 42
        })));

        assert_eq!(snapshot.flag(SettingKey::BlockShorts), Some(false));
        assert_eq!(snapshot.flag(SettingKey::BlockFeed), Some(true));
        assert_eq!(snapshot.flag(SettingKey::BlockComments), None);
        assert_eq!(snapshot.reenable_at(), Some(1_700_000_180_000));
    }

    #[test]
    fn test_snapshot_ignores_malformed_values() {
        let snapshot = StorageSnapshot::from_values(&values(json!({
            "global_blockShorts": "yes",
            "shortsReenableAt": "soon"
        })));

        assert_eq!(snapshot.flag(SettingKey::BlockShorts), None);
        assert_eq!(snapshot.reenable_at(), None);
    }

    #[test]
    fn test_snapshot_accepts_float_timestamps() {
        let snapshot = StorageSnapshot::from_values(&values(json!({
            "shortsReenableAt": 1_700_000_000_000.0
        })));

        assert_eq!(snapshot.reenable_at(), Some(1_700_000_000_000));
    }

    #[test]
    fn test_settings_or_only_overlays_requested_keys() {
        let snapshot = StorageSnapshot::from_values(&values(json!({
            "global_blockShorts": false,
            "global_blockComments": true
        })));
        let defaults = Settings::from_defaults(&[(SettingKey::BlockShorts, true)]);

        let settings = snapshot.settings_or(defaults, &[SettingKey::BlockShorts, SettingKey::BlockFeed]);

        assert!(!settings.block_shorts);
        assert!(!settings.block_feed);
        assert!(!settings.block_comments);
    }

    #[test]
    fn test_parse_change_notification() {
        let changes: StorageChanges = serde_json::from_value(json!({
            "global_blockFeed": { "oldValue": false, "newValue": true },
            "shortsReenableAt": { "oldValue": 1_700_000_000_000i64, "newValue": null },
            "somethingElse": { "newValue": 3 }
        }))
        .unwrap();

        let flags: Vec<_> = changes.flag_changes().collect();

        assert_eq!(flags, vec![(SettingKey::BlockFeed, Some(true))]);
        assert_eq!(changes.reenable_at_change(), Some(None));
    }

    #[test]
    fn test_removed_flag_reports_none() {
        let changes: StorageChanges = serde_json::from_value(json!({
            "global_blockShorts": { "oldValue": true }
        }))
        .unwrap();

        let flags: Vec<_> = changes.flag_changes().collect();

        assert_eq!(flags, vec![(SettingKey::BlockShorts, None)]);
        assert_eq!(changes.reenable_at_change(), None);
    }

    #[test]
    fn test_reenable_patch_serializes_null() {
        let patch = SettingsPatch::reenable_shorts();

        let json = serde_json::to_value(&patch).unwrap();

        assert_eq!(json, json!({ "global_blockShorts": true, "shortsReenableAt": null }));
    }

    #[test]
    fn test_snooze_patch_carries_timestamp() {
        let patch = SettingsPatch::new()
            .flag(SettingKey::BlockShorts, false)
            .reenable_at(Some(1_700_000_300_000));

        assert_eq!(patch.get("global_blockShorts"), Some(&Value::Bool(false)));
        assert_eq!(patch.get("shortsReenableAt"), Some(&json!(1_700_000_300_000i64)));
    }
}
