//! Deferred re-enable of shorts blocking after a snooze
//!
//! The scheduler is a two-state machine (idle / armed at T) sitting on top
//! of a single named, durable alarm slot. Re-arming the slot by name is what
//! supersedes an older snooze; only one wake-up can ever be outstanding.
use crate::settings::EpochMillis;
use crate::storage::{SettingsPatch, StorageChanges, StorageSnapshot};

/// Name of the one alarm slot used for the re-enable timer
pub const REENABLE_ALARM: &str = "enableShortsBlocker";

/// A wall-clock anchored wake-up facility that survives process restarts
pub trait WakeupSlots {
    /// Arm `name` for `at`, replacing any earlier time for the same name
    fn arm(&mut self, name: &str, at: EpochMillis);
    fn disarm(&mut self, name: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed { at: EpochMillis },
}

pub struct ReenableScheduler<W> {
    wakeups: W,
    state: SchedulerState,
    /// A live timestamp change arrived; snapshots read before it are stale
    seen_live_change: bool,
}

impl<W: WakeupSlots> ReenableScheduler<W> {
    pub fn new(wakeups: W) -> Self {
        ReenableScheduler {
            wakeups,
            state: SchedulerState::Idle,
            seen_live_change: false,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn wakeups(&self) -> &W {
        &self.wakeups
    }

    pub fn wakeups_mut(&mut self) -> &mut W {
        &mut self.wakeups
    }

    /// React to a store write. A new timestamp (re-)arms, an explicit null cancels.
    pub fn on_storage_changed(&mut self, changes: &StorageChanges) {
        match changes.reenable_at_change() {
            Some(Some(at)) => self.arm(at),
            Some(None) => self.cancel(),
            None => return,
        }
        self.seen_live_change = true;
    }

    /// The alarm slot fired. Returns the batch to write, unconditionally.
    pub fn on_alarm(&mut self, name: &str) -> Option<SettingsPatch> {
        if name != REENABLE_ALARM {
            log::debug!("Ignoring unrelated alarm {name}");
            return None;
        }

        log::info!("Snooze elapsed, re-enabling shorts blocking");
        self.state = SchedulerState::Idle;
        Some(SettingsPatch::reenable_shorts())
    }

    /// Bring the slot in line with the stored timestamp after a cold start.
    ///
    /// A deadline that passed while nothing was running fires right away.
    /// Skipped once a live change has been handled, since the snapshot may
    /// predate it.
    pub fn reconcile(&mut self, snapshot: &StorageSnapshot, now: EpochMillis) -> Option<SettingsPatch> {
        if self.seen_live_change {
            log::debug!("Snooze state already current, skipping startup reconcile");
            return None;
        }
        match snapshot.reenable_at() {
            Some(at) if at <= now => {
                log::info!("Snooze deadline {at} passed while suspended, re-enabling now");
                self.wakeups.disarm(REENABLE_ALARM);
                self.state = SchedulerState::Idle;
                Some(SettingsPatch::reenable_shorts())
            }
            Some(at) => {
                self.arm(at);
                None
            }
            None => {
                self.cancel();
                None
            }
        }
    }

    fn arm(&mut self, at: EpochMillis) {
        if let SchedulerState::Armed { at: previous } = self.state {
            if previous != at {
                log::info!("Superseding re-enable at {previous} with {at}");
            }
        }
        log::info!("Re-enable armed for {at}");
        self.wakeups.arm(REENABLE_ALARM, at);
        self.state = SchedulerState::Armed { at };
    }

    fn cancel(&mut self) {
        if let SchedulerState::Armed { at } = self.state {
            log::info!("Re-enable for {at} cancelled");
        }
        // the slot may still be armed from before a restart, so always clear it
        self.wakeups.disarm(REENABLE_ALARM);
        self.state = SchedulerState::Idle;
    }
}
