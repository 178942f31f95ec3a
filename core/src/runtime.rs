//! The runtime: instance arena, instance registry, handler table and the
//! lifecycle operations that drive render scheduling.
//!
//! Everything that used to be process-wide state lives here, so two runtimes
//! never observe each other's instances or handlers.

use std::{
    any::Any,
    collections::{HashMap, HashSet},
    fmt,
};

use crate::{
    InstanceId,
    config::RuntimeConfig,
    element::{Element, ElementCx, ElementInit, Lifecycle, RenderCx},
    error::{ConfigError, DispatchError, RuntimeError, SurfaceError},
    event::Event,
    handler::HandlerTable,
    host::{FrameHandle, Host, MemoryHost, Surface},
    id::IdAllocator,
    log::{self, LogLevel},
    node::Renderable,
    scheduler::RenderRequester,
    state::{State, StateMap, StateStore},
    template::{AnonymousHandlers, Html},
};

struct Instance<S> {
    id: InstanceId,
    element: Box<dyn Element>,
    state: StateStore,
    props: StateMap,
    children: String,
    pending: Option<FrameHandle>,
    anonymous: AnonymousHandlers,
    log_level: LogLevel,
    surface: Option<S>,
    lifecycle: Lifecycle,
    render_count: u64,
}

impl<S> fmt::Debug for Instance<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("lifecycle", &self.lifecycle)
            .field("pending", &self.pending)
            .field("has_surface", &self.surface.is_some())
            .finish_non_exhaustive()
    }
}

/// A handler resolved by [`Runtime::handler`], ready to be invoked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerRef {
    instance: InstanceId,
    handler: String,
}

impl HandlerRef {
    /// Owning instance.
    #[must_use]
    pub const fn instance(&self) -> &InstanceId {
        &self.instance
    }

    /// Handler name.
    #[must_use]
    pub fn handler(&self) -> &str {
        &self.handler
    }
}

/// Builder for [`Runtime`].
#[derive(Debug, Default, Clone)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
}

impl RuntimeBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the expression rendered markup calls to reach the dispatch entry point.
    #[must_use]
    pub fn dispatch_target(mut self, target: impl Into<String>) -> Self {
        self.config.dispatch_target = target.into();
        self
    }

    /// Sets the log level of instances that do not choose their own.
    #[must_use]
    pub const fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    /// Finalises the builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build<H: Host>(self, host: H) -> Result<Runtime<H>, ConfigError> {
        self.config.validate()?;
        Ok(Runtime::with_config(host, self.config))
    }
}

/// Owner of every element instance created against one host.
pub struct Runtime<H: Host> {
    host: H,
    config: RuntimeConfig,
    ids: IdAllocator,
    instances: HashMap<InstanceId, Instance<H::Surface>>,
    registry: HashSet<InstanceId>,
    handlers: HandlerTable,
}

impl<H: Host> fmt::Debug for Runtime<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("instances", &self.instances.len())
            .field("registry", &self.registry)
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl<H: Host> Runtime<H> {
    /// Creates a runtime with the default configuration.
    #[must_use]
    pub fn new(host: H) -> Self {
        Self::with_config(host, RuntimeConfig::default())
    }

    fn with_config(host: H, config: RuntimeConfig) -> Self {
        Self {
            host,
            config,
            ids: IdAllocator::default(),
            instances: HashMap::new(),
            registry: HashSet::new(),
            handlers: HandlerTable::default(),
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The host.
    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The handler table shared by every instance of this runtime.
    #[must_use]
    pub const fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    /// Constructs an instance: assigns its identifier, builds its state and,
    /// for rendering elements, allocates its surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot allocate a surface.
    pub fn create<E: Element>(&mut self, element: E, init: ElementInit) -> Result<InstanceId, RuntimeError> {
        self.create_boxed(Box::new(element), init)
    }

    /// Same as [`create`](Self::create) for an already boxed element.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot allocate a surface.
    pub fn create_boxed(
        &mut self,
        element: Box<dyn Element>,
        init: ElementInit,
    ) -> Result<InstanceId, RuntimeError> {
        let id = self.ids.next(element.tag_name());
        let log_level = init.log_level.unwrap_or(self.config.log_level);
        log::lifecycle(log_level, &id, "constructor");

        let surface = if element.renders() {
            Some(self.host.attach_surface(&id, element.tag_name())?)
        } else {
            None
        };

        let instance = Instance {
            id: id.clone(),
            element,
            state: StateStore::new(init.state),
            props: init.props,
            children: init.children,
            pending: None,
            anonymous: AnonymousHandlers::default(),
            log_level,
            surface,
            lifecycle: Lifecycle::Constructed,
            render_count: 0,
        };
        self.instances.insert(id.clone(), instance);
        Ok(id)
    }

    /// Connection: back-fills default state, registers the instance and requests a render.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownInstance`] for identifiers not in this runtime.
    pub fn connect(&mut self, id: &InstanceId) -> Result<(), RuntimeError> {
        let Self {
            host,
            instances,
            registry,
            ..
        } = self;
        let instance = instances
            .get_mut(id)
            .ok_or_else(|| RuntimeError::UnknownInstance(id.clone()))?;
        log::lifecycle(instance.log_level, id, "connectedCallback");

        let has_surface = instance.surface.is_some();
        let mut requester = RenderRequester::new(
            &instance.id,
            &mut instance.pending,
            has_surface,
            host,
            instance.log_level,
        );

        log::lifecycle(instance.log_level, id, "setDefaultStateValues");
        let defaults = instance.state.missing_defaults();
        if !defaults.is_empty() {
            let mut state = State::new(&mut instance.state, requester.reborrow());
            for (key, value) in defaults {
                state.set(key, value);
            }
        }
        requester.request();

        instance.lifecycle = Lifecycle::Connected;
        registry.insert(id.clone());
        Ok(())
    }

    /// Observed attribute change: unconditionally requests a render.
    ///
    /// Returns `true` if a frame was requested.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownInstance`] for identifiers not in this runtime.
    pub fn attribute_changed(&mut self, id: &InstanceId) -> Result<bool, RuntimeError> {
        if let Some(instance) = self.instances.get(id) {
            log::lifecycle(instance.log_level, id, "attributeChangedCallback");
        }
        self.request_render(id)
    }

    /// Schedules one render pass for the next frame.
    ///
    /// A no-op returning `false` when a pass is already pending or the
    /// instance has no surface.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownInstance`] for identifiers not in this runtime.
    pub fn request_render(&mut self, id: &InstanceId) -> Result<bool, RuntimeError> {
        let instance = self
            .instances
            .get_mut(id)
            .ok_or_else(|| RuntimeError::UnknownInstance(id.clone()))?;
        let has_surface = instance.surface.is_some();
        let mut requester = RenderRequester::new(
            &instance.id,
            &mut instance.pending,
            has_surface,
            &mut self.host,
            instance.log_level,
        );
        Ok(requester.request())
    }

    /// Disconnection: cancels the pending frame, unregisters the instance and
    /// releases its handler slot.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownInstance`] for identifiers not in this runtime.
    pub fn disconnect(&mut self, id: &InstanceId) -> Result<(), RuntimeError> {
        let instance = self
            .instances
            .get_mut(id)
            .ok_or_else(|| RuntimeError::UnknownInstance(id.clone()))?;
        log::lifecycle(instance.log_level, id, "disconnectedCallback");

        let has_surface = instance.surface.is_some();
        RenderRequester::new(
            &instance.id,
            &mut instance.pending,
            has_surface,
            &mut self.host,
            instance.log_level,
        )
        .cancel();
        self.registry.remove(id);
        self.handlers.release(id);
        instance.lifecycle = Lifecycle::Disconnected;
        Ok(())
    }

    /// Drops an instance from the runtime, disconnecting it first if needed,
    /// and hands the element back.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownInstance`] for identifiers not in this runtime.
    pub fn remove(&mut self, id: &InstanceId) -> Result<Box<dyn Element>, RuntimeError> {
        if self.registry.contains(id) {
            self.disconnect(id)?;
        }
        let instance = self
            .instances
            .remove(id)
            .ok_or_else(|| RuntimeError::UnknownInstance(id.clone()))?;
        if let Some(handle) = instance.pending {
            self.host.cancel_frame(handle);
        }
        self.handlers.release(id);
        Ok(instance.element)
    }

    /// Runs the render pass requested under `handle`.
    ///
    /// Frames whose handle no longer matches the instance's pending token
    /// (cancelled, or the instance was removed) are ignored and return `false`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Surface`] if the output cannot be applied. The
    /// pending token is cleared either way; the post-render hook only runs on
    /// success.
    pub fn run_frame(&mut self, id: &InstanceId, handle: FrameHandle) -> Result<bool, RuntimeError> {
        let Self {
            host,
            config,
            instances,
            handlers,
            ..
        } = self;
        let Some(instance) = instances.get_mut(id) else {
            return Ok(false);
        };
        if instance.pending != Some(handle) {
            return Ok(false);
        }
        log::lifecycle(instance.log_level, id, "render");

        let Instance {
            id,
            element,
            state,
            props,
            children,
            pending,
            anonymous,
            log_level,
            surface,
            render_count,
            ..
        } = instance;
        let id: &InstanceId = id;
        let log_level = *log_level;
        let has_surface = surface.is_some();

        let output = {
            let requester = RenderRequester::new(id, &mut *pending, has_surface, &mut *host, log_level);
            let html = Html::for_render(id, handlers, &mut *anonymous, &config.dispatch_target, log_level);
            let mut cx = RenderCx::new(ElementCx::new(props, &mut *state, requester), children.as_str(), html);
            element.render(&mut cx)
        };

        let applied = surface
            .as_mut()
            .map_or(Ok(()), |surface| apply(surface, output));
        *pending = None;
        applied?;
        *render_count += 1;

        log::lifecycle(log_level, id, "onload");
        let requester = RenderRequester::new(id, &mut *pending, has_surface, &mut *host, log_level);
        let mut cx = ElementCx::new(props, &mut *state, requester);
        element.on_load(&mut cx);
        Ok(true)
    }

    /// Binds the template helper to an instance outside of a render pass.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownInstance`] for identifiers not in this runtime.
    pub fn template(&mut self, id: &InstanceId) -> Result<Html<'_>, RuntimeError> {
        let Self {
            config,
            instances,
            handlers,
            ..
        } = self;
        let instance = instances
            .get_mut(id)
            .ok_or_else(|| RuntimeError::UnknownInstance(id.clone()))?;
        Ok(Html::new(
            &instance.id,
            handlers,
            &mut instance.anonymous,
            &config.dispatch_target,
            instance.log_level,
        ))
    }

    /// Runs `f` against an instance as if it were one of its handlers.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownInstance`] for identifiers not in this runtime.
    pub fn update<R>(
        &mut self,
        id: &InstanceId,
        f: impl FnOnce(&mut dyn Element, &mut ElementCx<'_>) -> R,
    ) -> Result<R, RuntimeError> {
        let instance = self
            .instances
            .get_mut(id)
            .ok_or_else(|| RuntimeError::UnknownInstance(id.clone()))?;
        let has_surface = instance.surface.is_some();
        let requester = RenderRequester::new(
            &instance.id,
            &mut instance.pending,
            has_surface,
            &mut self.host,
            instance.log_level,
        );
        let mut cx = ElementCx::new(&instance.props, &mut instance.state, requester);
        Ok(f(&mut *instance.element, &mut cx))
    }

    /// Global dispatch entry point: runs handler `handler` of `instance` with
    /// the owning element as `this`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the instance is not connected, has no
    /// handler slot or has no handler under that name. Nothing runs then.
    pub fn dispatch(&mut self, instance: &str, handler: &str, event: &Event) -> Result<(), DispatchError> {
        let target = self.handler(instance, handler)?;
        self.invoke(&target, event)
    }

    /// Resolves a handler without running it.
    ///
    /// # Errors
    ///
    /// Same lookup failures as [`dispatch`](Self::dispatch).
    pub fn handler(&self, instance: &str, handler: &str) -> Result<HandlerRef, DispatchError> {
        let id = self
            .registry
            .get(instance)
            .ok_or_else(|| missing_slot(instance, handler))?;
        let slot = self
            .handlers
            .slot(instance)
            .ok_or_else(|| missing_slot(instance, handler))?;
        if !slot.contains(handler) {
            return Err(missing_handler(instance, handler));
        }
        Ok(HandlerRef {
            instance: id.clone(),
            handler: handler.to_string(),
        })
    }

    /// Runs a handler previously resolved with [`handler`](Self::handler).
    ///
    /// # Errors
    ///
    /// Fails like [`dispatch`](Self::dispatch) if the handler went away since
    /// it was resolved.
    pub fn invoke(&mut self, target: &HandlerRef, event: &Event) -> Result<(), DispatchError> {
        let Self {
            host,
            instances,
            registry,
            handlers,
            ..
        } = self;
        let name = target.handler.as_str();
        let instance_id = target.instance.as_str();
        if !registry.contains(&target.instance) {
            return Err(missing_slot(instance_id, name));
        }
        let callback = handlers
            .slot_mut(instance_id)
            .ok_or_else(|| missing_slot(instance_id, name))?
            .get_mut(name)
            .ok_or_else(|| missing_handler(instance_id, name))?;
        let instance = instances
            .get_mut(&target.instance)
            .ok_or_else(|| missing_slot(instance_id, name))?;
        log::debug(instance.log_level, &target.instance, "dispatch", &name);

        let has_surface = instance.surface.is_some();
        let requester = RenderRequester::new(
            &instance.id,
            &mut instance.pending,
            has_surface,
            host,
            instance.log_level,
        );
        let mut cx = ElementCx::new(&instance.props, &mut instance.state, requester);
        callback.call(&mut *instance.element, &mut cx, event);
        Ok(())
    }

    /// Returns `true` if the instance is in the instance registry (connected).
    #[must_use]
    pub fn is_registered(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    /// Identifiers of every connected instance.
    pub fn registered(&self) -> impl Iterator<Item = &InstanceId> {
        self.registry.iter()
    }

    /// Returns `true` if the instance exists in this runtime.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.instances.contains_key(id)
    }

    /// Lifecycle state of an instance.
    #[must_use]
    pub fn lifecycle(&self, id: &str) -> Option<Lifecycle> {
        self.instances.get(id).map(|instance| instance.lifecycle)
    }

    /// Returns `true` while a render pass is scheduled for the instance.
    #[must_use]
    pub fn is_render_pending(&self, id: &str) -> bool {
        self.instances
            .get(id)
            .is_some_and(|instance| instance.pending.is_some())
    }

    /// Number of completed render passes of an instance.
    #[must_use]
    pub fn render_count(&self, id: &str) -> Option<u64> {
        self.instances.get(id).map(|instance| instance.render_count)
    }

    /// The instance's state store.
    #[must_use]
    pub fn state(&self, id: &str) -> Option<&StateStore> {
        self.instances.get(id).map(|instance| &instance.state)
    }

    /// The instance's surface, `None` for unknown or surface-less instances.
    #[must_use]
    pub fn surface(&self, id: &str) -> Option<&H::Surface> {
        self.instances.get(id).and_then(|instance| instance.surface.as_ref())
    }

    /// Serialized surface content of an instance.
    #[must_use]
    pub fn markup(&self, id: &str) -> Option<String> {
        self.surface(id).map(Surface::markup)
    }

    /// The concrete element behind an instance.
    #[must_use]
    pub fn element<T: Element>(&self, id: &str) -> Option<&T> {
        let element: &dyn Any = &*self.instances.get(id)?.element;
        element.downcast_ref::<T>()
    }
}

impl Runtime<MemoryHost> {
    /// Fires every frame requested so far and returns how many render passes ran.
    ///
    /// Frames requested while these passes run wait for the next call.
    ///
    /// # Errors
    ///
    /// Returns the first render error; the remaining frames still run.
    pub fn advance_frame(&mut self) -> Result<usize, RuntimeError> {
        let mut rendered = 0;
        let mut first_error = None;
        for (handle, id) in self.host.take_frames() {
            match self.run_frame(&id, handle) {
                Ok(true) => rendered += 1,
                Ok(false) => {}
                Err(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }
        first_error.map_or(Ok(rendered), Err)
    }
}

fn apply<S: Surface>(surface: &mut S, output: Renderable) -> Result<(), SurfaceError> {
    match output {
        Renderable::Markup(markup) => surface.set_markup(&markup),
        Renderable::Template(template) => surface.set_markup(&template.flatten()),
        Renderable::Nodes(nodes) => surface.replace_children(nodes),
        Renderable::Node(node) => surface.append(node),
    }
}

fn missing_slot(instance: &str, handler: &str) -> DispatchError {
    DispatchError::MissingSlot {
        instance: instance.to_string(),
        handler: handler.to_string(),
    }
}

fn missing_handler(instance: &str, handler: &str) -> DispatchError {
    DispatchError::MissingHandler {
        instance: instance.to_string(),
        handler: handler.to_string(),
    }
}
