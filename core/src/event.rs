//! Events delivered to handlers through the dispatch entry point.

use serde_json::Value;

/// A DOM event as seen by element handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: String,
    detail: Value,
}

impl Event {
    /// Creates an event of the given type (`click`, `input`, ...).
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: Value::Null,
        }
    }

    /// Attaches event specific data, such as an input's value.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Event type.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Event specific data, `null` when absent.
    #[must_use]
    pub const fn detail(&self) -> &Value {
        &self.detail
    }
}
