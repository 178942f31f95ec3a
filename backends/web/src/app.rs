use std::{
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
};

use ezelement_core::{
    Element, ElementInit, Event, InstanceId, Runtime, RuntimeBuilder, RuntimeConfig,
};
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue, closure::Closure};

use crate::{
    dom::DomRoot,
    error::WebError,
    host::{INSTANCE_ATTRIBUTE, RuntimeLink, SharedRuntime, WebHost},
};

type DispatchFn = Closure<dyn Fn(String, String) -> JsValue>;

/// Builder for [`WebApp`].
#[derive(Debug, Clone)]
pub struct WebAppBuilder {
    root_id: Option<String>,
    config: RuntimeConfig,
    install_dispatch: bool,
}

impl Default for WebAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WebAppBuilder {
    /// Creates a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root_id: None,
            config: RuntimeConfig::default(),
            install_dispatch: true,
        }
    }

    /// Sets the DOM element identifier that should host the elements.
    #[must_use]
    pub fn with_root_id(mut self, id: impl Into<String>) -> Self {
        self.root_id = Some(id.into());
        self
    }

    /// Replaces the runtime configuration.
    #[must_use]
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Controls whether the global dispatch function is installed on `window`.
    ///
    /// Without it, markup produced by the template helper cannot reach its
    /// handlers; dispatch then has to go through [`WebApp::dispatch`].
    #[must_use]
    pub const fn install_dispatch(mut self, install: bool) -> Self {
        self.install_dispatch = install;
        self
    }

    /// Finalises the builder and creates a [`WebApp`].
    ///
    /// # Errors
    ///
    /// Returns an error if the DOM root element cannot be found, the
    /// configuration is invalid or the dispatch function cannot be installed.
    pub fn build(self) -> Result<WebApp, WebError> {
        console_error_panic_hook::set_once();

        let root = DomRoot::new(self.root_id.as_deref())?;
        let property = if self.install_dispatch {
            Some(dispatch_property(&self.config.dispatch_target)?.to_string())
        } else {
            None
        };

        let link = RuntimeLink::default();
        let host = WebHost::new(root.window().clone(), root.document().clone(), Rc::clone(&link));
        let runtime = RuntimeBuilder::new().with_config(self.config).build(host)?;
        let runtime: SharedRuntime = Rc::new(RefCell::new(runtime));
        if link.set(Rc::downgrade(&runtime)).is_err() {
            tracing::warn!(target: "ezelement", "frame link was already bound");
        }

        let dispatch = match property {
            Some(property) => {
                let dispatch = dispatch_function(Rc::downgrade(&runtime));
                root.set_global(&property, dispatch.as_ref())?;
                tracing::info!(target: "ezelement", %property, "installed dispatch function");
                Some(dispatch)
            }
            None => None,
        };

        Ok(WebApp {
            root,
            runtime,
            elements: HashMap::new(),
            _dispatch: dispatch,
        })
    }
}

/// Entry point for running custom elements inside the browser.
///
/// Owns the runtime, the element hosts it inserted into the mounting point
/// and the global dispatch function. Dropping the app invalidates that
/// function, so keep it alive for as long as the page uses its elements.
pub struct WebApp {
    root: DomRoot,
    runtime: SharedRuntime,
    elements: HashMap<InstanceId, web_sys::Element>,
    _dispatch: Option<DispatchFn>,
}

impl core::fmt::Debug for WebApp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebApp")
            .field("root", &self.root)
            .field("elements", &self.elements.len())
            .finish_non_exhaustive()
    }
}

impl WebApp {
    /// Returns a [`WebAppBuilder`].
    #[must_use]
    pub fn builder() -> WebAppBuilder {
        WebAppBuilder::new()
    }

    /// Creates an instance, inserts its element host into the mounting point
    /// and connects it. The first render runs on the next animation frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the host element cannot be created or inserted.
    pub fn mount<E: Element>(&mut self, element: E, init: ElementInit) -> Result<InstanceId, WebError> {
        let mut runtime = self.runtime.try_borrow_mut().map_err(|_| WebError::Busy)?;
        let tag_name = element.tag_name().to_string();
        let id = runtime.create(element, init)?;

        let host = if let Some(host) = runtime.host_mut().take_element(&id) {
            host
        } else {
            let host = self.root.document().create_element(&tag_name)?;
            host.set_attribute(INSTANCE_ATTRIBUTE, id.as_str())?;
            host
        };
        self.root.insert(&host)?;
        runtime.connect(&id)?;
        self.elements.insert(id.clone(), host);
        Ok(id)
    }

    /// Removes the element host from the document and disconnects the
    /// instance. It can be inserted again with [`reconnect`](Self::reconnect).
    ///
    /// # Errors
    ///
    /// Returns an error for unknown instances.
    pub fn disconnect(&mut self, id: &InstanceId) -> Result<(), WebError> {
        let mut runtime = self.runtime.try_borrow_mut().map_err(|_| WebError::Busy)?;
        runtime.disconnect(id)?;
        if let Some(host) = self.elements.get(id) {
            DomRoot::detach(host);
        }
        Ok(())
    }

    /// Inserts a disconnected element host again and connects the instance.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown instances or if insertion fails.
    pub fn reconnect(&mut self, id: &InstanceId) -> Result<(), WebError> {
        let mut runtime = self.runtime.try_borrow_mut().map_err(|_| WebError::Busy)?;
        if let Some(host) = self.elements.get(id) {
            self.root.insert(host)?;
        }
        runtime.connect(id)?;
        Ok(())
    }

    /// Disconnects the instance, drops it from the runtime and removes its
    /// element host.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown instances.
    pub fn unmount(&mut self, id: &InstanceId) -> Result<(), WebError> {
        let mut runtime = self.runtime.try_borrow_mut().map_err(|_| WebError::Busy)?;
        runtime.remove(id)?;
        if let Some(host) = self.elements.remove(id) {
            DomRoot::detach(&host);
        }
        Ok(())
    }

    /// Sets an attribute on the element host and signals the change.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute cannot be set or the instance is unknown.
    pub fn set_attribute(&self, id: &InstanceId, name: &str, value: &str) -> Result<bool, WebError> {
        if let Some(host) = self.elements.get(id) {
            host.set_attribute(name, value)?;
        }
        self.attribute_changed(id)
    }

    /// Observed attribute change: requests a render. Returns `true` if a frame was requested.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown instances.
    pub fn attribute_changed(&self, id: &InstanceId) -> Result<bool, WebError> {
        let mut runtime = self.runtime.try_borrow_mut().map_err(|_| WebError::Busy)?;
        Ok(runtime.attribute_changed(id)?)
    }

    /// Runs a handler directly, bypassing the global dispatch function.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler cannot be found.
    pub fn dispatch(&self, instance: &str, handler: &str, event: &Event) -> Result<(), WebError> {
        let mut runtime = self.runtime.try_borrow_mut().map_err(|_| WebError::Busy)?;
        Ok(runtime.dispatch(instance, handler, event)?)
    }

    /// Runs `f` with exclusive access to the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`WebError::Busy`] when called from element code.
    pub fn with_runtime<R>(&self, f: impl FnOnce(&mut Runtime<WebHost>) -> R) -> Result<R, WebError> {
        let mut runtime = self.runtime.try_borrow_mut().map_err(|_| WebError::Busy)?;
        Ok(f(&mut *runtime))
    }

    /// The element host of an instance.
    #[must_use]
    pub fn element(&self, id: &InstanceId) -> Option<&web_sys::Element> {
        self.elements.get(id)
    }
}

/// Property name on `window` for a dispatch target such as
/// `window.__get_method_handler`.
fn dispatch_property(target: &str) -> Result<&str, WebError> {
    let property = target.strip_prefix("window.").unwrap_or(target);
    let valid = !property.is_empty()
        && property
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if valid {
        Ok(property)
    } else {
        Err(WebError::DispatchTarget(target.to_string()))
    }
}

/// `(instance, handler) => (event) => void`
///
/// Lookup failures throw from the outer call, before any event arrives.
fn dispatch_function(runtime: Weak<RefCell<Runtime<WebHost>>>) -> DispatchFn {
    Closure::new(move |instance: String, handler: String| -> JsValue {
        let Some(shared) = runtime.upgrade() else {
            wasm_bindgen::throw_str("ezelement runtime was dropped");
        };
        let resolved = match shared.try_borrow() {
            Ok(runtime) => runtime.handler(&instance, &handler).map_err(|error| error.to_string()),
            Err(_) => Err(WebError::Busy.to_string()),
        };
        let target = match resolved {
            Ok(target) => target,
            Err(message) => {
                drop(shared);
                wasm_bindgen::throw_str(&message);
            }
        };

        let weak = Rc::downgrade(&shared);
        Closure::once_into_js(move |event: web_sys::Event| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let result = shared
                .try_borrow_mut()
                .map_err(|_| WebError::Busy)
                .and_then(|mut runtime| Ok(runtime.invoke(&target, &convert_event(&event))?));
            if let Err(error) = result {
                drop(shared);
                wasm_bindgen::throw_str(&error.to_string());
            }
        })
    })
}

/// Carries the event type and, for `CustomEvent`s, the JSON-compatible detail.
fn convert_event(event: &web_sys::Event) -> Event {
    let converted = Event::new(event.type_());
    let detail = event
        .dyn_ref::<web_sys::CustomEvent>()
        .map(web_sys::CustomEvent::detail)
        .filter(|detail| !detail.is_undefined() && !detail.is_null())
        .and_then(|detail| js_sys::JSON::stringify(&detail).ok())
        .map(String::from)
        .and_then(|json| serde_json::from_str::<Value>(&json).ok());
    match detail {
        Some(detail) => converted.with_detail(detail),
        None => converted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_target_installs_on_window() {
        assert_eq!(
            dispatch_property(ezelement_core::DEFAULT_DISPATCH_TARGET).ok(),
            Some("__get_method_handler")
        );
        assert_eq!(dispatch_property("dispatchEvent$").ok(), Some("dispatchEvent$"));
    }

    #[test]
    fn nested_targets_are_rejected() {
        assert!(matches!(
            dispatch_property("app.handlers.get"),
            Err(WebError::DispatchTarget(_))
        ));
        assert!(dispatch_property("window.").is_err());
    }
}
