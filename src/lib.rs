//! Social Sentry - Chrome Extension for Mindful Social Media
//! Built with Rust + WASM + Yew

pub mod background;
pub mod chrome;
pub mod content;
pub mod engine;
pub mod error;
pub mod initializer;
pub mod motivation;
pub mod policy;
pub mod routes;
pub mod scheduler;
pub mod settings;
pub mod sites;
pub mod snooze;
pub mod storage;
pub mod ui;

#[cfg(test)]
mod test_support;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

// Attach the policy engine for the current site
#[wasm_bindgen]
pub fn start_content_script() {
    if let Err(err) = content::start() {
        log::error!("Content script not started: {err}");
    }
}

// Service worker entry points, one per chrome event
#[wasm_bindgen]
pub fn start_background() {
    background::start();
}

#[wasm_bindgen]
pub fn background_on_installed(reason: String) {
    background::on_installed(reason);
}

#[wasm_bindgen]
pub fn background_on_storage_changed(changes: JsValue) {
    background::on_storage_changed(changes);
}

#[wasm_bindgen]
pub fn background_on_alarm(name: String) {
    background::on_alarm(name);
}

#[wasm_bindgen]
pub fn background_on_before_navigate(details: JsValue) {
    background::on_before_navigate(details);
}
