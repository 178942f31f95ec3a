use ezelement_core::{ConfigError, DispatchError, HostError, RuntimeError, SurfaceError};
use thiserror::Error;
use wasm_bindgen::JsValue;

/// Error type produced by the web backend.
#[derive(Debug, Error)]
pub enum WebError {
    /// The DOM APIs are not accessible (e.g., when executed outside of a browser).
    #[error("DOM is not available")]
    DomUnavailable,
    /// The requested mounting node cannot be located.
    #[error("failed to find DOM element with id `{0}`")]
    RootNotFound(String),
    /// The dispatch target is not a plain property name on `window`.
    #[error("dispatch target `{0}` cannot be installed on window")]
    DispatchTarget(String),
    /// The runtime is already in use, e.g. when element code calls back into the app.
    #[error("runtime is busy")]
    Busy,
    /// A runtime lifecycle operation failed.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    /// The runtime configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Handler lookup failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Wrapper around JavaScript exceptions.
    #[error("JavaScript error: {0}")]
    Js(String),
}

pub(crate) fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

impl From<JsValue> for WebError {
    fn from(value: JsValue) -> Self {
        Self::Js(describe(&value))
    }
}

impl From<WebError> for JsValue {
    fn from(value: WebError) -> Self {
        match value {
            WebError::Js(message) => Self::from(message),
            other => Self::from(other.to_string()),
        }
    }
}

pub(crate) fn host_error(value: &JsValue) -> HostError {
    HostError::Backend(describe(value))
}

pub(crate) fn surface_error(value: &JsValue) -> SurfaceError {
    SurfaceError(describe(value))
}
