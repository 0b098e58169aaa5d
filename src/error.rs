use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error)]
pub enum Error {
    #[error("settings store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("page not ready: {0}")]
    PageNotReady(&'static str),
    #[error("DOM call failed: {0}")]
    Dom(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_wasm_bindgen::Error> for Error {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        Error::Malformed(err.to_string())
    }
}

/// Render a thrown JS value for an error message
pub fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}
