//! Bridge to the `chrome.*` extension APIs through `js/chrome.js`
use crate::error::{Error, Result, describe};
use crate::scheduler::WakeupSlots;
use crate::settings::EpochMillis;
use crate::storage::{SettingsPatch, StorageChanges, StorageSnapshot, StoredValues};
use serde::Serialize;
use wasm_bindgen::prelude::*;

// Import JS bridge functions
#[wasm_bindgen(module = "/js/chrome.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(keys: JsValue) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(items: JsValue) -> std::result::Result<(), JsValue>;

    fn addStorageListener(listener: &js_sys::Function);

    fn removeStorageListener(listener: &js_sys::Function);

    fn createAlarm(name: &str, when: f64);

    fn clearAlarm(name: &str);

    #[wasm_bindgen(catch)]
    async fn updateTabUrl(tab_id: i32, url: &str) -> std::result::Result<(), JsValue>;
}

/// Read `keys` (or everything, for `None`) from `chrome.storage.local`
pub async fn load_values(keys: Option<&[&str]>) -> Result<StoredValues> {
    let keys = match keys {
        Some(keys) => serde_wasm_bindgen::to_value(keys)?,
        None => JsValue::NULL,
    };

    let raw = getStorage(keys)
        .await
        .map_err(|e| Error::StoreUnavailable(describe(&e)))?;

    if raw.is_null() || raw.is_undefined() {
        return Ok(StoredValues::new());
    }
    Ok(serde_wasm_bindgen::from_value(raw)?)
}

pub async fn load_snapshot(keys: Option<&[&str]>) -> Result<StorageSnapshot> {
    let values = load_values(keys).await?;
    Ok(StorageSnapshot::from_values(&values))
}

/// Write one batch. Serialized JSON-style so a cleared timestamp lands as `null`.
pub async fn save(patch: &SettingsPatch) -> Result<()> {
    let items = patch.serialize(&serde_wasm_bindgen::Serializer::json_compatible())?;

    setStorage(items)
        .await
        .map_err(|e| Error::StoreUnavailable(describe(&e)))
}

/// Live `chrome.storage.onChanged` registration; unregisters on drop
pub struct StorageSubscription {
    listener: Closure<dyn FnMut(JsValue)>,
}

impl StorageSubscription {
    /// Keep the listener for the lifetime of the page
    pub fn keep_alive(self) {
        std::mem::forget(self);
    }
}

impl Drop for StorageSubscription {
    fn drop(&mut self) {
        removeStorageListener(self.listener.as_ref().unchecked_ref());
    }
}

pub fn subscribe(mut on_change: impl FnMut(StorageChanges) + 'static) -> StorageSubscription {
    let listener = Closure::<dyn FnMut(JsValue)>::new(move |raw: JsValue| {
        match serde_wasm_bindgen::from_value::<StorageChanges>(raw) {
            Ok(changes) => on_change(changes),
            Err(err) => log::warn!("Ignoring unreadable storage change: {err}"),
        }
    });
    addStorageListener(listener.as_ref().unchecked_ref());

    StorageSubscription { listener }
}

/// `chrome.alarms`: durable, named, wall-clock anchored
pub struct ChromeAlarms;

impl WakeupSlots for ChromeAlarms {
    fn arm(&mut self, name: &str, at: EpochMillis) {
        createAlarm(name, at as f64);
    }

    fn disarm(&mut self, name: &str) {
        clearAlarm(name);
    }
}

pub async fn update_tab(tab_id: i32, url: &str) -> Result<()> {
    updateTabUrl(tab_id, url)
        .await
        .map_err(|e| Error::Navigation(describe(&e)))
}

pub fn now_millis() -> EpochMillis {
    js_sys::Date::now() as EpochMillis
}
