//! The element contract and the contexts handed to element code.

use core::{
    any::Any,
    ops::{Deref, DerefMut},
};

use serde_json::Value;

use crate::{
    InstanceId,
    log::LogLevel,
    node::{Renderable, Template},
    scheduler::RenderRequester,
    state::{State, StateMap, StateStore},
    template::{Arg, Html},
};

/// A custom element.
///
/// Implementors provide the tag name and, usually, a [`render`](Element::render)
/// override. The runtime drives the lifecycle: it renders the element once
/// per animation frame after connection, attribute changes and state writes.
pub trait Element: Any {
    /// Tag name, e.g. `x-counter`. Instance identifiers derive from it.
    fn tag_name(&self) -> &str;

    /// Whether the element renders at all.
    ///
    /// Elements returning `false` get no rendering surface and every render
    /// request for them is a no-op.
    fn renders(&self) -> bool {
        true
    }

    /// Produces the surface content for one render pass.
    fn render(&mut self, cx: &mut RenderCx<'_>) -> Renderable {
        let _ = cx;
        Renderable::empty()
    }

    /// Runs after every completed render pass.
    fn on_load(&mut self, cx: &mut ElementCx<'_>) {
        let _ = cx;
    }
}

/// Construction inputs for an element instance.
#[derive(Debug, Clone, Default)]
pub struct ElementInit {
    pub(crate) props: StateMap,
    pub(crate) state: StateMap,
    pub(crate) children: String,
    pub(crate) log_level: Option<LogLevel>,
}

impl ElementInit {
    /// Empty props, empty state, no children.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property.
    #[must_use]
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Adds an initial state field. Its value is also the default restored on connection.
    #[must_use]
    pub fn state(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state.insert(key.into(), value.into());
        self
    }

    /// Replaces the whole initial state.
    #[must_use]
    pub fn with_state(mut self, state: StateMap) -> Self {
        self.state = state;
        self
    }

    /// Original light-DOM content, passed to every render pass.
    #[must_use]
    pub fn children(mut self, markup: impl Into<String>) -> Self {
        self.children = markup.into();
        self
    }

    /// Log level of this instance, overriding the runtime default.
    #[must_use]
    pub const fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }
}

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Created, never connected.
    Constructed,
    /// Inserted into a live document.
    Connected,
    /// Removed from the document.
    Disconnected,
}

/// Access to an instance's identity, props and state.
///
/// Handed to handlers and to [`Element::on_load`].
pub struct ElementCx<'a> {
    id: &'a InstanceId,
    props: &'a StateMap,
    store: &'a mut StateStore,
    requester: RenderRequester<'a>,
}

impl<'a> ElementCx<'a> {
    pub(crate) fn new(
        props: &'a StateMap,
        store: &'a mut StateStore,
        requester: RenderRequester<'a>,
    ) -> Self {
        Self {
            id: requester.id(),
            props,
            store,
            requester,
        }
    }

    /// Identifier of the instance.
    #[must_use]
    pub const fn id(&self) -> &'a InstanceId {
        self.id
    }

    /// Construction props.
    #[must_use]
    pub const fn props(&self) -> &'a StateMap {
        self.props
    }

    /// One construction prop.
    #[must_use]
    pub fn prop(&self, key: &str) -> Option<&'a Value> {
        self.props.get(key)
    }

    /// The state accessor view.
    pub fn state(&mut self) -> State<'_> {
        State::new(&mut *self.store, self.requester.reborrow())
    }

    /// Schedules a render for the next frame. Returns `true` if a frame was requested.
    pub fn request_render(&mut self) -> bool {
        self.requester.request()
    }
}

impl core::fmt::Debug for ElementCx<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ElementCx")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Context of one render pass.
///
/// Dereferences to [`ElementCx`]; additionally exposes the original children
/// and the template helper bound to this instance.
pub struct RenderCx<'a> {
    cx: ElementCx<'a>,
    children: &'a str,
    html: Html<'a>,
}

impl<'a> RenderCx<'a> {
    pub(crate) fn new(cx: ElementCx<'a>, children: &'a str, html: Html<'a>) -> Self {
        Self { cx, children, html }
    }

    /// Original light-DOM markup of the element.
    #[must_use]
    pub const fn children(&self) -> &'a str {
        self.children
    }

    /// The template helper bound to this instance.
    pub fn html(&mut self) -> &mut Html<'a> {
        &mut self.html
    }

    /// Runs the template helper over literal segments and arguments.
    pub fn template<S, I>(&mut self, strings: &[S], args: I) -> Template
    where
        S: AsRef<str>,
        I: IntoIterator<Item = Arg>,
    {
        self.html.call(strings, args)
    }
}

impl<'a> Deref for RenderCx<'a> {
    type Target = ElementCx<'a>;

    fn deref(&self) -> &Self::Target {
        &self.cx
    }
}

impl DerefMut for RenderCx<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cx
    }
}

impl core::fmt::Debug for RenderCx<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RenderCx")
            .field("id", &self.cx.id)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}
