//! Runtime configuration, built in code or parsed from JSON.

use serde::Deserialize;

use crate::{error::ConfigError, log::LogLevel};

/// Default expression that rendered markup calls to reach the dispatch entry point.
pub const DEFAULT_DISPATCH_TARGET: &str = "window.__get_method_handler";

/// Runtime-wide settings.
///
/// ```
/// use ezelement_core::{LogLevel, RuntimeConfig};
///
/// let config = RuntimeConfig::from_json(r#"{ "log_level": "all" }"#).unwrap();
/// assert_eq!(config.log_level, LogLevel::All);
/// assert_eq!(config.dispatch_target, "window.__get_method_handler");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Function expression embedded in handler attributes, called as
    /// `<target>('<instance>', '<handler>')(event)`.
    pub dispatch_target: String,
    /// Log level for instances that do not choose their own.
    pub log_level: LogLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dispatch_target: DEFAULT_DISPATCH_TARGET.to_string(),
            log_level: LogLevel::None,
        }
    }
}

impl RuntimeConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is malformed or the dispatch
    /// target cannot be embedded in markup.
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the dispatch target can be embedded in a double-quoted attribute.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DispatchTarget`] for empty or quoted targets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let target = self.dispatch_target.trim();
        if target.is_empty() || target.contains(['"', '\'', '<', '>']) {
            return Err(ConfigError::DispatchTarget(self.dispatch_target.clone()));
        }
        Ok(())
    }
}
