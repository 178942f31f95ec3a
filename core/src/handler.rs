//! Callbacks and the per-instance handler table.
//!
//! The template helper stores every callback it sees under a name. Rendered
//! markup refers to handlers only by `(instance, name)`, so the table is the
//! sole bridge between markup and element code:
//!
//! - Named callbacks keep their name; a later callback with the same name
//!   replaces the earlier one.
//! - Anonymous callbacks receive a synthesized `<instance>_<ordinal>` name
//!   and are purged on the next template invocation.

use std::{any::Any, collections::HashMap, fmt};

use crate::{InstanceId, element::{Element, ElementCx}, event::Event};

type HandlerFn = dyn FnMut(&mut dyn Element, &mut ElementCx<'_>, &Event);

/// An event handler passed to the template helper.
///
/// The first argument is the owning element (`this`), the second gives access
/// to its state, the third is the triggering event.
pub struct Callback {
    name: Option<String>,
    func: Box<HandlerFn>,
}

impl Callback {
    /// Creates an anonymous callback over the type-erased element.
    pub fn new<F>(func: F) -> Self
    where
        F: FnMut(&mut dyn Element, &mut ElementCx<'_>, &Event) + 'static,
    {
        Self {
            name: None,
            func: Box::new(func),
        }
    }

    /// Creates a named callback over the type-erased element.
    pub fn named<F>(name: impl Into<String>, func: F) -> Self
    where
        F: FnMut(&mut dyn Element, &mut ElementCx<'_>, &Event) + 'static,
    {
        Self::new(func).with_name(name)
    }

    /// Creates a named callback bound to a concrete element type.
    ///
    /// When dispatched to an element of another type the call is skipped and a
    /// warning is logged.
    pub fn method<T, F>(name: impl Into<String>, func: F) -> Self
    where
        T: Element,
        F: FnMut(&mut T, &mut ElementCx<'_>, &Event) + 'static,
    {
        Self::closure(func).with_name(name)
    }

    /// Creates an anonymous callback bound to a concrete element type.
    pub fn closure<T, F>(mut func: F) -> Self
    where
        T: Element,
        F: FnMut(&mut T, &mut ElementCx<'_>, &Event) + 'static,
    {
        Self::new(move |this, cx, event| {
            let this: &mut dyn Any = this;
            match this.downcast_mut::<T>() {
                Some(this) => func(this, cx, event),
                None => tracing::warn!(
                    target: "ezelement",
                    instance = %cx.id(),
                    expected = core::any::type_name::<T>(),
                    "handler bound to another element type"
                ),
            }
        })
    }

    /// Renames the callback.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declared or synthesized name; `None` while anonymous.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn call(&mut self, this: &mut dyn Element, cx: &mut ElementCx<'_>, event: &Event) {
        (self.func)(this, cx, event);
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Handler name to callback mapping of one instance.
#[derive(Debug, Default)]
pub struct HandlerSlot {
    handlers: HashMap<String, Callback>,
}

impl HandlerSlot {
    /// Returns `true` if a handler is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered handler names, in arbitrary order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub(crate) fn insert(&mut self, name: String, callback: Callback) {
        self.handlers.insert(name, callback);
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Callback> {
        self.handlers.remove(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Callback> {
        self.handlers.get_mut(name)
    }

    fn clear(&mut self) {
        self.handlers.clear();
    }
}

/// Handler slots of every instance, keyed by instance identifier.
#[derive(Debug, Default)]
pub struct HandlerTable {
    slots: HashMap<InstanceId, HandlerSlot>,
}

impl HandlerTable {
    /// Slot of `instance`, if one was created.
    #[must_use]
    pub fn slot(&self, instance: &str) -> Option<&HandlerSlot> {
        self.slots.get(instance)
    }

    /// Number of instances owning a slot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no instance owns a slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn slot_mut(&mut self, instance: &str) -> Option<&mut HandlerSlot> {
        self.slots.get_mut(instance)
    }

    pub(crate) fn ensure_slot(&mut self, instance: &InstanceId) -> &mut HandlerSlot {
        self.slots.entry(instance.clone()).or_default()
    }

    /// Clears every entry of the slot, then drops the slot itself.
    pub(crate) fn release(&mut self, instance: &InstanceId) -> bool {
        self.slots.remove(instance).is_some_and(|mut slot| {
            slot.clear();
            true
        })
    }
}

/// Runs handlers outside a runtime, against a throwaway element and state.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::{
        host::MemoryHost,
        log::LogLevel,
        scheduler::RenderRequester,
        state::{StateMap, StateStore},
    };

    struct Bare;

    impl Element for Bare {
        fn tag_name(&self) -> &str {
            "x-bare"
        }
    }

    /// Fires handler `name` of `instance` and returns the state it left behind.
    pub(crate) fn fire(table: &mut HandlerTable, instance: &InstanceId, name: &str) -> StateStore {
        let mut host = MemoryHost::new();
        let mut pending = None;
        let mut store = StateStore::default();
        let props = StateMap::new();
        let callback = table
            .slot_mut(instance.as_str())
            .and_then(|slot| slot.get_mut(name))
            .expect("handler is registered");
        let requester = RenderRequester::new(instance, &mut pending, true, &mut host, LogLevel::None);
        let mut cx = ElementCx::new(&props, &mut store, requester);
        callback.call(&mut Bare, &mut cx, &Event::new("click"));
        drop(cx);
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdAllocator;
    use serde_json::json;

    #[test]
    fn with_name_turns_anonymous_callbacks_into_named_ones() {
        let callback = Callback::new(|_, _, _| {});
        assert_eq!(callback.name(), None);
        let callback = callback.with_name("X__0_1");
        assert_eq!(callback.name(), Some("X__0_1"));
    }

    #[test]
    fn release_drops_slot_and_entries() {
        let mut table = HandlerTable::default();
        let id = IdAllocator::default().next("x-test");
        table
            .ensure_slot(&id)
            .insert("onClick".into(), Callback::named("onClick", |_, _, _| {}));
        assert_eq!(table.slot(id.as_str()).map(HandlerSlot::len), Some(1));
        assert!(table.release(&id));
        assert!(table.slot(id.as_str()).is_none());
        assert!(!table.release(&id));
        assert!(table.is_empty());
    }

    #[test]
    fn same_name_replaces_the_entry() {
        let mut table = HandlerTable::default();
        let id = IdAllocator::default().next("x-test");
        let slot = table.ensure_slot(&id);
        slot.insert(
            "onClick".into(),
            Callback::named("onClick", |_, cx, _| cx.state().set("clicked", "first")),
        );
        slot.insert(
            "onClick".into(),
            Callback::named("onClick", |_, cx, _| cx.state().set("clicked", "second")),
        );
        assert_eq!(slot.len(), 1);
        assert_eq!(slot.names().collect::<Vec<_>>(), ["onClick"]);

        let state = testing::fire(&mut table, &id, "onClick");
        assert_eq!(state.get("clicked"), Some(&json!("second")));
    }
}
