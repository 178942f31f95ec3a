//! Reactive element state.
//!
//! [`StateStore`] owns the values; [`State`] is the accessor view handed to
//! element code. Every write through [`State::set`] requests a render of the
//! owning instance, even when the value did not change.

use std::{collections::BTreeMap, sync::Arc};

use serde_json::Value;

use crate::{log, scheduler::RenderRequester};

/// Field name to value mapping used for state and props.
pub type StateMap = BTreeMap<String, Value>;

/// Backing store of one instance: live values plus the frozen initial values.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    values: StateMap,
    initial: Arc<StateMap>,
}

impl StateStore {
    /// Creates a store whose live values start as a copy of `initial`.
    #[must_use]
    pub fn new(initial: StateMap) -> Self {
        Self {
            values: initial.clone(),
            initial: Arc::new(initial),
        }
    }

    /// Reads a live value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Live values.
    #[must_use]
    pub const fn values(&self) -> &StateMap {
        &self.values
    }

    /// Values supplied at construction.
    #[must_use]
    pub fn initial(&self) -> &StateMap {
        &self.initial
    }

    /// Initial entries whose key is absent from the live values.
    pub(crate) fn missing_defaults(&self) -> Vec<(String, Value)> {
        self.initial
            .iter()
            .filter(|(key, _)| !self.values.contains_key(*key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Accessor view over an instance's state.
///
/// ```
/// # use ezelement_core::prelude::*;
/// # use serde_json::json;
/// struct Counter;
/// impl Element for Counter {
///     fn tag_name(&self) -> &str { "x-counter" }
///     fn render(&mut self, cx: &mut RenderCx<'_>) -> Renderable {
///         format!("Count: {}", cx.state().value("count")).into()
///     }
/// }
///
/// let mut runtime = Runtime::new(MemoryHost::new());
/// let id = runtime.create(Counter, ElementInit::new().state("count", 0)).unwrap();
/// runtime.connect(&id).unwrap();
/// runtime.advance_frame().unwrap();
/// assert_eq!(runtime.markup(id.as_str()).as_deref(), Some("Count: 0"));
/// ```
pub struct State<'a> {
    store: &'a mut StateStore,
    requester: RenderRequester<'a>,
}

impl<'a> State<'a> {
    pub(crate) fn new(store: &'a mut StateStore, requester: RenderRequester<'a>) -> Self {
        Self { store, requester }
    }

    /// Reads a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        log::lifecycle(self.requester.log_level(), self.requester.id(), "getState");
        self.store.get(key)
    }

    /// Reads a field, returning `null` when it is absent.
    #[must_use]
    pub fn value(&self, key: &str) -> Value {
        self.get(key).cloned().unwrap_or(Value::Null)
    }

    /// Reads a numeric field as `i64`.
    #[must_use]
    pub fn i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Reads a string field.
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Writes a field and requests a render.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        log::lifecycle(self.requester.log_level(), self.requester.id(), "setState");
        self.store.values.insert(key.into(), value.into());
        self.requester.request();
    }

    /// Removes a field without rendering. The next connection restores its
    /// initial value, if it had one.
    pub fn unset(&mut self, key: &str) -> Option<Value> {
        self.store.values.remove(key)
    }

    /// Names of the live fields.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.store.values.keys().map(String::as_str)
    }

    /// Values supplied at construction.
    #[must_use]
    pub fn initial(&self) -> &StateMap {
        self.store.initial()
    }
}

impl core::fmt::Debug for State<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("State")
            .field("values", &self.store.values)
            .finish_non_exhaustive()
    }
}
