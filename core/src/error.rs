//! Error types for the runtime and its hosts.

use thiserror::Error;

use crate::InstanceId;

/// Lookup failures raised by the dispatch entry point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The instance is not connected or never rendered a handler.
    #[error("can't find event handlers for element `{instance}` (handler `{handler}`)")]
    MissingSlot {
        /// Identifier passed to the dispatch entry point.
        instance: String,
        /// Handler name passed to the dispatch entry point.
        handler: String,
    },
    /// The instance has a handler slot but no entry under that name.
    #[error("can't find handler `{handler}` for element `{instance}`")]
    MissingHandler {
        /// Identifier passed to the dispatch entry point.
        instance: String,
        /// Handler name passed to the dispatch entry point.
        handler: String,
    },
}

/// Failure reported by a rendering surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("surface error: {0}")]
pub struct SurfaceError(pub String);

/// Failure reported by a host while allocating surfaces or frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The host environment (document, window) is not reachable.
    #[error("host environment is unavailable")]
    Unavailable,
    /// Any other backend failure.
    #[error("host error: {0}")]
    Backend(String),
}

/// Errors returned by [`Runtime`](crate::Runtime) lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// No instance with this identifier exists in the runtime.
    #[error("unknown element instance `{0}`")]
    UnknownInstance(InstanceId),
    /// Applying render output to the surface failed.
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    /// The host failed to provide a surface.
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Invalid runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// The dispatch target cannot be embedded in an attribute value.
    #[error("dispatch target `{0}` must be a non-empty expression without quotes")]
    DispatchTarget(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_errors_name_both_keys() {
        let error = DispatchError::MissingHandler {
            instance: "X-COUNTER__0".into(),
            handler: "increment".into(),
        };
        let message = error.to_string();
        assert!(message.contains("X-COUNTER__0"));
        assert!(message.contains("increment"));
    }

    #[test]
    fn surface_errors_convert_into_runtime_errors() {
        let error: RuntimeError = SurfaceError("detached".into()).into();
        assert_eq!(error.to_string(), "surface error: detached");
    }
}
