//! Install/upgrade-time default filling
use crate::settings::SettingKey;
use crate::storage::{SettingsPatch, StoredValues};

/// Stage a default for every known flag missing from `existing`.
///
/// Keys that are present are never touched, whatever they hold, so user
/// choices survive upgrades. Returns `None` when nothing needs writing.
pub fn missing_defaults(existing: &StoredValues) -> Option<SettingsPatch> {
    let patch = SettingKey::ALL
        .into_iter()
        .filter(|key| !existing.contains_key(key.storage_key()))
        .fold(SettingsPatch::new(), |patch, key| {
            patch.flag(key, key.global_default())
        });

    if patch.is_empty() { None } else { Some(patch) }
}

/// Storage names the initializer reads
pub fn known_keys() -> Vec<&'static str> {
    SettingKey::ALL.iter().map(|key| key.storage_key()).collect()
}
