use crate::error::WebError;

use wasm_bindgen::JsValue;

use web_sys::{Document, Element, Window};

/// Id given to the mounting element when none is configured.
pub const DEFAULT_ROOT_ID: &str = "ezelement-root";

#[derive(Debug, Clone)]
pub struct DomRoot {
    window: Window,
    document: Document,
    element: Element,
}

impl DomRoot {
    /// Creates a [`DomRoot`] pointing at the provided element id, or at a
    /// fresh `div` appended to `body`.
    pub fn new(root_id: Option<&str>) -> Result<Self, WebError> {
        let window: Window = web_sys::window().ok_or(WebError::DomUnavailable)?;
        let document: Document = window.document().ok_or(WebError::DomUnavailable)?;

        let element = if let Some(id) = root_id {
            document
                .get_element_by_id(id)
                .ok_or_else(|| WebError::RootNotFound(id.to_string()))?
        } else {
            let body = document.body().ok_or(WebError::DomUnavailable)?;
            let host = document.create_element("div")?;
            host.set_id(DEFAULT_ROOT_ID);
            body.append_child(&host)?;
            host
        };

        Ok(Self {
            window,
            document,
            element,
        })
    }

    /// Returns the owning document.
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub const fn window(&self) -> &Window {
        &self.window
    }

    /// Inserts an element host as the last child of the mounting point.
    pub fn insert(&self, host: &Element) -> Result<(), WebError> {
        self.element.append_child(host)?;
        Ok(())
    }

    /// Detaches an element host from wherever it currently lives.
    pub fn detach(host: &Element) {
        host.remove();
    }

    /// Sets `window[name] = value`.
    pub fn set_global(&self, name: &str, value: &JsValue) -> Result<(), WebError> {
        js_sys::Reflect::set(&self.window, &JsValue::from_str(name), value)?;
        Ok(())
    }
}
