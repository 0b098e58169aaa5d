//! Service-worker side: defaults on install, snooze timer, early redirects
//!
//! The worker can be torn down between any two events, so nothing here
//! relies on in-memory state surviving. The scheduler is rebuilt on every
//! boot and reconciled against the stored deadline.
use crate::chrome::{self, ChromeAlarms};
use crate::initializer::{known_keys, missing_defaults};
use crate::scheduler::ReenableScheduler;
use crate::settings::SettingKey;
use crate::sites::profile_for_url;
use crate::storage::StorageChanges;
use serde::Deserialize;
use std::cell::RefCell;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;

thread_local! {
    static SCHEDULER: RefCell<ReenableScheduler<ChromeAlarms>> =
        RefCell::new(ReenableScheduler::new(ChromeAlarms));
}

/// Subset of `webNavigation.onBeforeNavigate` details
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavigationDetails {
    pub tab_id: i32,
    #[serde(default)]
    pub frame_id: i32,
    pub url: String,
}

/// Where a top-level navigation should be sent instead, if anywhere
pub fn redirect_for_navigation(details: &NavigationDetails, block_shorts: bool) -> Option<&'static str> {
    if details.frame_id != 0 || !block_shorts {
        return None;
    }
    let profile = profile_for_url(&details.url)?;
    profile
        .routes
        .classify(&details.url)
        .is_short_form()
        .then_some(profile.home_url)
}

/// Worker boot: catch up on a deadline missed while the browser was closed
pub fn start() {
    spawn_local(async {
        let snapshot = match chrome::load_snapshot(None).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                log::error!("Could not read snooze state on startup: {err}");
                return;
            }
        };

        let patch = SCHEDULER.with(|scheduler| scheduler.borrow_mut().reconcile(&snapshot, chrome::now_millis()));
        if let Some(patch) = patch {
            if let Err(err) = chrome::save(&patch).await {
                log::error!("Missed snooze could not be re-enabled: {err}");
            }
        }
    });
}

pub fn on_installed(reason: String) {
    spawn_local(async move {
        let keys = known_keys();
        let existing = match chrome::load_values(Some(keys.as_slice())).await {
            Ok(existing) => existing,
            Err(err) => {
                log::error!("Defaults not written ({reason}): {err}");
                return;
            }
        };

        match missing_defaults(&existing) {
            Some(patch) => match chrome::save(&patch).await {
                Ok(()) => log::info!("Defaults written on {reason}: {patch:?}"),
                Err(err) => log::error!("Defaults not written ({reason}): {err}"),
            },
            None => log::debug!("All settings present on {reason}"),
        }
    });
}

pub fn on_storage_changed(raw: JsValue) {
    let changes: StorageChanges = match serde_wasm_bindgen::from_value(raw) {
        Ok(changes) => changes,
        Err(err) => {
            log::warn!("Ignoring unreadable storage change: {err}");
            return;
        }
    };
    SCHEDULER.with(|scheduler| scheduler.borrow_mut().on_storage_changed(&changes));
}

pub fn on_alarm(name: String) {
    let Some(patch) = SCHEDULER.with(|scheduler| scheduler.borrow_mut().on_alarm(&name)) else {
        return;
    };
    spawn_local(async move {
        if let Err(err) = chrome::save(&patch).await {
            log::error!("Snooze timer lost, shorts blocking stays off: {err}");
        }
    });
}

pub fn on_before_navigate(raw: JsValue) {
    let details: NavigationDetails = match serde_wasm_bindgen::from_value(raw) {
        Ok(details) => details,
        Err(err) => {
            log::warn!("Ignoring unreadable navigation: {err}");
            return;
        }
    };
    if details.frame_id != 0 || profile_for_url(&details.url).is_none() {
        return;
    }

    spawn_local(async move {
        let key = SettingKey::BlockShorts;
        let block_shorts = match chrome::load_snapshot(Some([key.storage_key()].as_slice())).await {
            Ok(snapshot) => snapshot.flag(key).unwrap_or_else(|| key.global_default()),
            Err(err) => {
                log::warn!("{err}; assuming shorts are blocked");
                key.global_default()
            }
        };

        if let Some(home) = redirect_for_navigation(&details, block_shorts) {
            log::info!("Tab {}: {} blocked, sending to {home}", details.tab_id, details.url);
            if let Err(err) = chrome::update_tab(details.tab_id, home).await {
                log::warn!("Tab {}: {err}", details.tab_id);
            }
        }
    });
}
