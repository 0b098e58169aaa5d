//! Setting keys, defaults and the typed settings cache shared by every context
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch, as produced by `Date.now()`
pub type EpochMillis = i64;

/// Storage name of the nullable re-enable timestamp
pub const REENABLE_AT_KEY: &str = "shortsReenableAt";

/// A persisted boolean toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SettingKey {
    BlockShorts,
    BlockFeed,
    BlockNotifications,
    BlockComments,
    MotivationMode,
}

impl SettingKey {
    pub const ALL: [SettingKey; 5] = [
        SettingKey::BlockShorts,
        SettingKey::BlockFeed,
        SettingKey::BlockNotifications,
        SettingKey::BlockComments,
        SettingKey::MotivationMode,
    ];

    /// Key under which the flag lives in `chrome.storage.local`
    pub fn storage_key(self) -> &'static str {
        match self {
            SettingKey::BlockShorts => "global_blockShorts",
            SettingKey::BlockFeed => "global_blockFeed",
            SettingKey::BlockNotifications => "global_blockNotifications",
            SettingKey::BlockComments => "global_blockComments",
            SettingKey::MotivationMode => "global_motivationMode",
        }
    }

    pub fn from_storage_key(key: &str) -> Option<SettingKey> {
        SettingKey::ALL
            .into_iter()
            .find(|setting| setting.storage_key() == key)
    }

    /// Value written by the install-time initializer when the key is absent
    pub fn global_default(self) -> bool {
        matches!(self, SettingKey::BlockShorts)
    }

    pub fn label(self) -> &'static str {
        match self {
            SettingKey::BlockShorts => "Block Shorts & Reels",
            SettingKey::BlockFeed => "Block Feeds",
            SettingKey::BlockNotifications => "Hide Notification Badges",
            SettingKey::BlockComments => "Hide Comments",
            SettingKey::MotivationMode => "Motivation Mode",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SettingKey::BlockShorts => "YouTube Shorts, Facebook Reels & Stories, Instagram Reels",
            SettingKey::BlockFeed => "Home feeds and recommendations",
            SettingKey::BlockNotifications => "Unread counters on Facebook",
            SettingKey::BlockComments => "YouTube comment sections",
            SettingKey::MotivationMode => "A quote instead of the YouTube home page",
        }
    }
}

/// Local cache of the boolean toggles held by one context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    pub block_shorts: bool,
    pub block_feed: bool,
    pub block_notifications: bool,
    pub block_comments: bool,
    pub motivation_mode: bool,
}

impl Settings {
    /// Settings with every key at its global default
    pub fn global_defaults() -> Self {
        Self::from_defaults(&SettingKey::ALL.map(|key| (key, key.global_default())))
    }

    /// Build a cache from a `(key, default)` table; keys not listed stay off
    pub fn from_defaults(defaults: &[(SettingKey, bool)]) -> Self {
        let mut settings = Settings::default();
        for &(key, value) in defaults {
            settings.set(key, value);
        }
        settings
    }

    pub fn get(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::BlockShorts => self.block_shorts,
            SettingKey::BlockFeed => self.block_feed,
            SettingKey::BlockNotifications => self.block_notifications,
            SettingKey::BlockComments => self.block_comments,
            SettingKey::MotivationMode => self.motivation_mode,
        }
    }

    /// Returns true when the stored value actually changed
    pub fn set(&mut self, key: SettingKey, value: bool) -> bool {
        let slot = match key {
            SettingKey::BlockShorts => &mut self.block_shorts,
            SettingKey::BlockFeed => &mut self.block_feed,
            SettingKey::BlockNotifications => &mut self.block_notifications,
            SettingKey::BlockComments => &mut self.block_comments,
            SettingKey::MotivationMode => &mut self.motivation_mode,
        };
        let changed = *slot != value;
        *slot = value;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_names() {
        assert_eq!(SettingKey::BlockShorts.storage_key(), "global_blockShorts");
        assert_eq!(SettingKey::MotivationMode.storage_key(), "global_motivationMode");
        assert_eq!(
            SettingKey::from_storage_key("global_blockNotifications"),
            Some(SettingKey::BlockNotifications)
        );
        assert_eq!(SettingKey::from_storage_key("shortsReenableAt"), None);
        assert_eq!(SettingKey::from_storage_key("blockShorts"), None);
    }

    #[test]
    fn test_global_defaults() {
        let settings = Settings::global_defaults();

        assert!(settings.block_shorts);
        assert!(!settings.block_feed);
        assert!(!settings.block_notifications);
        assert!(!settings.block_comments);
        assert!(!settings.motivation_mode);
    }

    #[test]
    fn test_from_defaults_leaves_unlisted_keys_off() {
        let settings = Settings::from_defaults(&[
            (SettingKey::BlockShorts, true),
            (SettingKey::BlockFeed, true),
        ]);

        assert!(settings.get(SettingKey::BlockShorts));
        assert!(settings.get(SettingKey::BlockFeed));
        assert!(!settings.get(SettingKey::BlockComments));
    }

    #[test]
    fn test_set_reports_change() {
        let mut settings = Settings::default();

        assert!(settings.set(SettingKey::BlockComments, true));
        assert!(!settings.set(SettingKey::BlockComments, true));
        assert!(settings.set(SettingKey::BlockComments, false));
    }
}
