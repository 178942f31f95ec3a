//! Per-instance log verbosity on top of `tracing`.

use serde::{Deserialize, Serialize};

use crate::InstanceId;

/// How chatty an element instance is about its lifecycle.
///
/// Levels are ordered: `Debug` implies everything `All` logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Log nothing.
    #[default]
    None = 0,
    /// Log lifecycle callbacks and render passes.
    All = 1,
    /// Additionally log template arguments and handler names.
    Debug = 3,
}

impl LogLevel {
    /// Returns `true` if lifecycle messages are emitted.
    #[must_use]
    pub fn logs_lifecycle(self) -> bool {
        self >= Self::All
    }

    /// Returns `true` if template details are emitted.
    #[must_use]
    pub fn logs_debug(self) -> bool {
        self >= Self::Debug
    }
}

pub(crate) fn lifecycle(level: LogLevel, instance: &InstanceId, callback: &str) {
    if level.logs_lifecycle() {
        tracing::info!(target: "ezelement", instance = %instance, "{callback}");
    }
}

pub(crate) fn debug(level: LogLevel, instance: &InstanceId, what: &str, detail: &dyn core::fmt::Debug) {
    if level.logs_debug() {
        tracing::debug!(target: "ezelement", instance = %instance, ?detail, "{what}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(!LogLevel::None.logs_lifecycle());
        assert!(LogLevel::All.logs_lifecycle());
        assert!(!LogLevel::All.logs_debug());
        assert!(LogLevel::Debug.logs_lifecycle());
        assert!(LogLevel::Debug.logs_debug());
    }

    #[test]
    fn levels_parse_from_lowercase_names() {
        let level: LogLevel = serde_json::from_str("\"debug\"").expect("valid level");
        assert_eq!(level, LogLevel::Debug);
    }
}
