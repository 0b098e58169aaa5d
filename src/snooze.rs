//! Popup model: toggle state, snooze prompt and countdown
//!
//! The Yew component renders this and performs the writes it returns. All
//! timing is derived from the stored absolute deadline, so closing and
//! reopening the popup never drifts.
use crate::settings::{EpochMillis, SettingKey, Settings};
use crate::storage::{SettingsPatch, StorageChanges, StorageSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnoozeChoice {
    OneMinute,
    FiveMinutes,
    TenMinutes,
}

impl SnoozeChoice {
    pub const ALL: [SnoozeChoice; 3] = [
        SnoozeChoice::OneMinute,
        SnoozeChoice::FiveMinutes,
        SnoozeChoice::TenMinutes,
    ];

    pub fn minutes(self) -> i64 {
        match self {
            SnoozeChoice::OneMinute => 1,
            SnoozeChoice::FiveMinutes => 5,
            SnoozeChoice::TenMinutes => 10,
        }
    }

    pub fn duration_ms(self) -> EpochMillis {
        self.minutes() * 60_000
    }

    pub fn label(self) -> &'static str {
        match self {
            SnoozeChoice::OneMinute => "1 minute",
            SnoozeChoice::FiveMinutes => "5 minutes",
            SnoozeChoice::TenMinutes => "10 minutes",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupState {
    pub settings: Settings,
    pub reenable_at: Option<EpochMillis>,
    pub snooze_prompt: bool,
}

impl PopupState {
    /// Build the model from a full store read.
    ///
    /// A deadline that already passed is shown as re-enabled straight away,
    /// and the returned batch persists that.
    pub fn load(snapshot: &StorageSnapshot, now: EpochMillis) -> (Self, Option<SettingsPatch>) {
        let mut state = PopupState {
            settings: snapshot.settings_or(Settings::global_defaults(), &SettingKey::ALL),
            reenable_at: snapshot.reenable_at(),
            snooze_prompt: false,
        };

        let heal = match state.reenable_at {
            Some(at) if at <= now => {
                state.expire();
                Some(SettingsPatch::reenable_shorts())
            }
            _ => None,
        };
        (state, heal)
    }

    pub fn is_checked(&self, key: SettingKey) -> bool {
        self.settings.get(key)
    }

    /// The user flipped a toggle to `checked`. Returns the batch to write.
    ///
    /// Turning shorts blocking off writes nothing: the toggle stays on and
    /// the snooze prompt opens instead.
    pub fn toggle(&mut self, key: SettingKey, checked: bool) -> Option<SettingsPatch> {
        match (key, checked) {
            (SettingKey::BlockShorts, false) => {
                self.snooze_prompt = true;
                None
            }
            (SettingKey::BlockShorts, true) => {
                self.expire();
                Some(SettingsPatch::reenable_shorts())
            }
            (key, value) => {
                self.settings.set(key, value);
                Some(SettingsPatch::new().flag(key, value))
            }
        }
    }

    pub fn choose_snooze(&mut self, choice: SnoozeChoice, now: EpochMillis) -> SettingsPatch {
        let until = now + choice.duration_ms();
        self.settings.set(SettingKey::BlockShorts, false);
        self.reenable_at = Some(until);
        self.snooze_prompt = false;

        SettingsPatch::new()
            .flag(SettingKey::BlockShorts, false)
            .reenable_at(Some(until))
    }

    pub fn cancel_snooze(&mut self) {
        self.snooze_prompt = false;
    }

    /// Remaining snooze time as `m:ss`, while one is running
    pub fn countdown(&self, now: EpochMillis) -> Option<String> {
        if self.settings.block_shorts {
            return None;
        }
        self.reenable_at
            .filter(|at| *at > now)
            .map(|at| format_countdown(at - now))
    }

    /// Advance the display clock. Returns true when the snooze ran out on this tick.
    pub fn tick(&mut self, now: EpochMillis) -> bool {
        match self.reenable_at {
            Some(at) if at <= now => {
                self.expire();
                true
            }
            _ => false,
        }
    }

    /// Merge a change notification from another context
    pub fn apply_changes(&mut self, changes: &StorageChanges) {
        for (key, value) in changes.flag_changes() {
            self.settings.set(key, value.unwrap_or_else(|| key.global_default()));
        }
        if let Some(reenable_at) = changes.reenable_at_change() {
            self.reenable_at = reenable_at;
        }
        if self.settings.block_shorts {
            self.snooze_prompt = false;
        }
    }

    fn expire(&mut self) {
        self.settings.set(SettingKey::BlockShorts, true);
        self.reenable_at = None;
        self.snooze_prompt = false;
    }
}

/// `m:ss`, rounding up so a running snooze never reads `0:00`
pub fn format_countdown(remaining_ms: EpochMillis) -> String {
    let seconds = (remaining_ms.max(0) + 999) / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
