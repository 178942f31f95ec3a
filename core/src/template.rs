//! The template helper.
//!
//! [`Html`] is bound to one instance. It turns callback arguments into
//! dispatch expressions such as
//! `window.__get_method_handler('X-COUNTER__0', 'increment')(event)` and
//! records the callbacks in the instance's handler slot, so handlers written
//! in markup always run against their own element without manual binding.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::{
    InstanceId,
    handler::{Callback, HandlerTable},
    log::{self, LogLevel},
    node::Template,
};

/// One interpolated template argument.
#[derive(Debug)]
pub enum Arg {
    /// A plain value, stringified when the template is flattened.
    Value(Value),
    /// Items joined into one string.
    List(Vec<String>),
    /// A nested template result, flattened into one string.
    Template(Template),
    /// An event handler, replaced by its dispatch expression.
    Callback(Callback),
}

macro_rules! impl_value_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Self::Value(Value::from(value))
                }
            }
        )*
    };
}

impl_value_arg!(Value, &str, String, bool, i32, i64, u32, u64, f64);

impl From<Vec<String>> for Arg {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Template> for Arg {
    fn from(value: Template) -> Self {
        Self::Template(value)
    }
}

impl From<Callback> for Arg {
    fn from(value: Callback) -> Self {
        Self::Callback(value)
    }
}

/// Synthesized names handed out by the last template invocation.
#[derive(Debug, Default)]
pub(crate) struct AnonymousHandlers {
    live: BTreeSet<String>,
    count: u64,
}

impl AnonymousHandlers {
    fn next_name(&mut self, instance: &InstanceId) -> String {
        self.count += 1;
        let name = format!("{instance}_{}", self.count);
        self.live.insert(name.clone());
        name
    }
}

/// Builds the expression rendered markup uses to reach a handler.
#[must_use]
pub fn dispatch_expression(target: &str, instance: &InstanceId, handler: &str) -> String {
    format!("{target}('{instance}', '{handler}')(event)")
}

/// Template helper bound to one instance.
pub struct Html<'a> {
    id: &'a InstanceId,
    handlers: &'a mut HandlerTable,
    anonymous: &'a mut AnonymousHandlers,
    dispatch_target: &'a str,
    log_level: LogLevel,
    purge_each_call: bool,
}

impl<'a> Html<'a> {
    /// Helper used outside a render pass: every invocation first drops the
    /// anonymous handlers of the previous one.
    pub(crate) fn new(
        id: &'a InstanceId,
        handlers: &'a mut HandlerTable,
        anonymous: &'a mut AnonymousHandlers,
        dispatch_target: &'a str,
        log_level: LogLevel,
    ) -> Self {
        Self {
            id,
            handlers,
            anonymous,
            dispatch_target,
            log_level,
            purge_each_call: true,
        }
    }

    /// Helper for one render pass. Anonymous handlers of the previous pass
    /// are dropped once, up front; every invocation within the pass keeps
    /// the handlers of the others, so nested templates stay dispatchable.
    pub(crate) fn for_render(
        id: &'a InstanceId,
        handlers: &'a mut HandlerTable,
        anonymous: &'a mut AnonymousHandlers,
        dispatch_target: &'a str,
        log_level: LogLevel,
    ) -> Self {
        let mut html = Self::new(id, handlers, anonymous, dispatch_target, log_level);
        html.purge_anonymous();
        html.purge_each_call = false;
        html
    }

    /// Processes one template invocation.
    ///
    /// Outside a render pass, anonymous handlers from the previous invocation
    /// are dropped first.
    /// Callback arguments are recorded under their name (synthesizing one for
    /// anonymous callbacks) and replaced by their dispatch expression.
    pub fn call<S, I>(&mut self, strings: &[S], args: I) -> Template
    where
        S: AsRef<str>,
        I: IntoIterator<Item = Arg>,
    {
        log::lifecycle(self.log_level, self.id, "rendering html");
        self.handlers.ensure_slot(self.id);
        if self.purge_each_call {
            self.purge_anonymous();
        }

        let mut values = Vec::new();
        for arg in args {
            log::debug(self.log_level, self.id, "html argument", &arg);
            let value = match arg {
                Arg::Value(value) => value,
                Arg::List(items) => Value::String(items.concat()),
                Arg::Template(template) => Value::String(template.flatten()),
                Arg::Callback(callback) => Value::String(self.bind(callback)),
            };
            values.push(value);
        }

        let strings = strings.iter().map(|s| s.as_ref().to_string()).collect();
        Template::new(strings, values)
    }

    /// Splits `literal` on `{}` placeholders and processes it with `args`.
    pub fn format<I>(&mut self, literal: &str, args: I) -> Template
    where
        I: IntoIterator<Item = Arg>,
    {
        let strings: Vec<&str> = literal.split("{}").collect();
        self.call(&strings, args)
    }

    fn purge_anonymous(&mut self) {
        if self.anonymous.live.is_empty() {
            return;
        }
        let stale = core::mem::take(&mut self.anonymous.live);
        if let Some(slot) = self.handlers.slot_mut(self.id.as_str()) {
            for name in &stale {
                slot.remove(name);
            }
        }
    }

    fn bind(&mut self, callback: Callback) -> String {
        let callback = match callback.name() {
            Some(_) => callback,
            None => {
                let name = self.anonymous.next_name(self.id);
                callback.with_name(name)
            }
        };
        let name = callback.name().unwrap_or_default().to_string();
        log::debug(self.log_level, self.id, "html handler", &name);

        let slot = self.handlers.ensure_slot(self.id);
        slot.remove(&name);
        slot.insert(name.clone(), callback);
        dispatch_expression(self.dispatch_target, self.id, &name)
    }
}

impl core::fmt::Debug for Html<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Html")
            .field("id", &self.id)
            .field("dispatch_target", &self.dispatch_target)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DEFAULT_DISPATCH_TARGET, handler::testing, id::IdAllocator};
    use serde_json::json;

    struct Fixture {
        id: InstanceId,
        handlers: HandlerTable,
        anonymous: AnonymousHandlers,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                id: IdAllocator::default().next("x-test"),
                handlers: HandlerTable::default(),
                anonymous: AnonymousHandlers::default(),
            }
        }

        fn html(&mut self) -> Html<'_> {
            Html::new(
                &self.id,
                &mut self.handlers,
                &mut self.anonymous,
                DEFAULT_DISPATCH_TARGET,
                LogLevel::Debug,
            )
        }

        fn render_pass(&mut self) -> Html<'_> {
            Html::for_render(
                &self.id,
                &mut self.handlers,
                &mut self.anonymous,
                DEFAULT_DISPATCH_TARGET,
                LogLevel::None,
            )
        }

        fn names(&self) -> Vec<String> {
            let mut names: Vec<String> = self
                .handlers
                .slot(self.id.as_str())
                .map(|slot| slot.names().map(str::to_string).collect())
                .unwrap_or_default();
            names.sort();
            names
        }
    }

    #[test]
    fn plain_values_pass_through() {
        let mut fixture = Fixture::new();
        let template = fixture
            .html()
            .call(&["", ""], [Arg::from("this is a dumb string")]);
        assert_eq!(template.flatten(), "this is a dumb string");
        assert_eq!(template.values(), [json!("this is a dumb string")]);
    }

    #[test]
    fn slot_is_created_on_first_invocation() {
        let mut fixture = Fixture::new();
        assert!(fixture.handlers.slot(fixture.id.as_str()).is_none());
        fixture.html().call(&["static"], []);
        assert!(fixture.handlers.slot(fixture.id.as_str()).is_some());
    }

    #[test]
    fn lists_and_nested_templates_are_joined() {
        let mut fixture = Fixture::new();
        let inner = Template::new(vec!["<li>".into(), "</li>".into()], vec![json!(1)]);
        let template = fixture.html().call(
            &["<ul>", "", "</ul>"],
            [Arg::from(inner), Arg::from(vec!["<li>2</li>".to_string(), "<li>3</li>".to_string()])],
        );
        assert_eq!(template.flatten(), "<ul><li>1</li><li>2</li><li>3</li></ul>");
    }

    #[test]
    fn anonymous_callbacks_get_fresh_names_and_are_purged() {
        let mut fixture = Fixture::new();
        let first = fixture
            .html()
            .call(&["", ""], [Arg::from(Callback::new(|_, _, _| {}))]);
        let first_name = format!("{}_1", fixture.id);
        assert_eq!(fixture.names(), [first_name.clone()]);

        let second = fixture
            .html()
            .call(&["", ""], [Arg::from(Callback::new(|_, _, _| {}))]);
        let second_name = format!("{}_2", fixture.id);
        assert_eq!(fixture.names(), [second_name.clone()]);
        assert_ne!(first.flatten(), second.flatten());
        assert_eq!(
            second.flatten(),
            format!("window.__get_method_handler('{}', '{second_name}')(event)", fixture.id)
        );
    }

    #[test]
    fn named_callbacks_replace_each_other() {
        let mut fixture = Fixture::new();
        for marker in ["first", "second"] {
            let template = fixture.html().call(
                &["<button onclick=\"", "\">+</button>"],
                [Arg::from(Callback::named("onClick", move |_, cx, _| {
                    cx.state().set("clicked", marker);
                }))],
            );
            assert_eq!(
                template.flatten(),
                format!(
                    "<button onclick=\"window.__get_method_handler('{}', 'onClick')(event)\">+</button>",
                    fixture.id
                )
            );
        }
        assert_eq!(fixture.names(), ["onClick"]);

        let state = testing::fire(&mut fixture.handlers, &fixture.id, "onClick");
        assert_eq!(state.get("clicked"), Some(&json!("second")));
    }

    #[test]
    fn render_pass_keeps_nested_anonymous_handlers() {
        let mut fixture = Fixture::new();
        let mut html = fixture.render_pass();
        let item = html.call(
            &["<li onclick=\"", "\">one</li>"],
            [Arg::from(Callback::new(|_, cx, _| cx.state().set("picked", "one")))],
        );
        let list = html.call(&["<ul>", "</ul>"], [Arg::from(item)]);
        drop(html);

        let inner = format!("{}_1", fixture.id);
        assert!(list.flatten().contains(&format!("'{inner}'")));
        assert_eq!(fixture.names(), [inner.clone()]);
        let state = testing::fire(&mut fixture.handlers, &fixture.id, &inner);
        assert_eq!(state.get("picked"), Some(&json!("one")));

        fixture.render_pass().call(&["<ul></ul>"], []);
        assert!(fixture.names().is_empty());
    }

    #[test]
    fn named_callbacks_survive_anonymous_purges() {
        let mut fixture = Fixture::new();
        fixture.html().call(
            &["", "", ""],
            [
                Arg::from(Callback::named("onClick", |_, _, _| {})),
                Arg::from(Callback::new(|_, _, _| {})),
            ],
        );
        fixture.html().call(&["static"], []);
        assert_eq!(fixture.names(), ["onClick"]);
    }

    #[test]
    fn format_splits_on_placeholders() {
        let mut fixture = Fixture::new();
        let template = fixture.html().format("Count: {} of {}", [Arg::from(1), Arg::from(2)]);
        assert_eq!(template.strings(), ["Count: ", " of ", ""]);
        assert_eq!(template.flatten(), "Count: 1 of 2");
    }
}
