//! Shadow-root surfaces and `requestAnimationFrame` scheduling.

use std::{
    cell::{Cell, OnceCell, RefCell},
    collections::HashMap,
    rc::{Rc, Weak},
};

use ezelement_core::{
    FrameHandle, FrameScheduler, Host, HostError, InstanceId, Node, Runtime, Surface,
    SurfaceError,
};
use wasm_bindgen::{JsCast, JsValue, closure::Closure};
use web_sys::{Document, Element, HtmlTemplateElement, ShadowRoot, ShadowRootInit, ShadowRootMode, Window};

use crate::error::{host_error, surface_error};

/// Attribute carrying the instance identifier on every element host.
pub const INSTANCE_ATTRIBUTE: &str = "data-ezelement-id";

pub(crate) type SharedRuntime = Rc<RefCell<Runtime<WebHost>>>;

/// Late-bound link from frame callbacks back to the runtime that owns the host.
pub(crate) type RuntimeLink = Rc<OnceCell<Weak<RefCell<Runtime<WebHost>>>>>;

/// Host backed by the browser document.
///
/// Every rendering instance gets an element host with an open shadow root.
/// Frames are requested with `requestAnimationFrame` and run the render pass
/// of the owning runtime when they fire.
pub struct WebHost {
    window: Window,
    document: Document,
    hosts: HashMap<InstanceId, Element>,
    frames: Rc<RefCell<FrameCallbacks<Closure<dyn FnMut()>>>>,
    link: RuntimeLink,
}

impl core::fmt::Debug for WebHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebHost")
            .field("hosts", &self.hosts.len())
            .field("frames", &self.frames.borrow().live.len())
            .finish_non_exhaustive()
    }
}

impl WebHost {
    pub(crate) fn new(window: Window, document: Document, link: RuntimeLink) -> Self {
        Self {
            window,
            document,
            hosts: HashMap::new(),
            frames: Rc::default(),
            link,
        }
    }

    /// Hands over the element host created for `instance`, if it renders.
    pub(crate) fn take_element(&mut self, instance: &InstanceId) -> Option<Element> {
        self.hosts.remove(instance)
    }
}

impl FrameScheduler for WebHost {
    fn request_frame(&mut self, instance: &InstanceId) -> Result<FrameHandle, HostError> {
        self.frames.borrow_mut().release_fired();

        let assigned: Rc<Cell<Option<FrameHandle>>> = Rc::new(Cell::new(None));
        let fired = Rc::clone(&assigned);
        let frames = Rc::downgrade(&self.frames);
        let link = Rc::clone(&self.link);
        let instance = instance.clone();

        let callback: Closure<dyn FnMut()> = Closure::once(move || {
            let Some(handle) = fired.get() else {
                return;
            };
            run_frame(&link, &instance, handle);
            if let Some(frames) = frames.upgrade() {
                frames.borrow_mut().mark_fired(handle);
            }
        });

        let raw = self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
            .map_err(|error| host_error(&error))?;
        let handle = u64::try_from(raw)
            .map(FrameHandle)
            .map_err(|_| HostError::Backend(format!("invalid frame id {raw}")))?;
        assigned.set(Some(handle));
        self.frames.borrow_mut().insert(handle, callback);
        Ok(handle)
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Ok(raw) = i32::try_from(handle.0) {
            if let Err(error) = self.window.cancel_animation_frame(raw) {
                tracing::warn!(target: "ezelement", error = %crate::error::describe(&error), "cancelAnimationFrame failed");
            }
        }
        self.frames.borrow_mut().cancel(handle);
    }
}

fn run_frame(link: &RuntimeLink, instance: &InstanceId, handle: FrameHandle) {
    let Some(runtime) = link.get().and_then(Weak::upgrade) else {
        return;
    };
    let Ok(mut runtime) = runtime.try_borrow_mut() else {
        tracing::error!(target: "ezelement", %instance, "runtime busy when the frame fired");
        return;
    };
    if let Err(error) = runtime.run_frame(instance, handle) {
        tracing::error!(target: "ezelement", %instance, %error, "render pass failed");
    }
}

/// Frame callbacks kept alive until they fire or are cancelled.
///
/// A fired callback is only marked: it may still be on the stack, so it is
/// dropped by the next [`release_fired`](Self::release_fired).
pub(crate) struct FrameCallbacks<C> {
    live: HashMap<FrameHandle, C>,
    fired: Vec<FrameHandle>,
}

impl<C> Default for FrameCallbacks<C> {
    fn default() -> Self {
        Self {
            live: HashMap::new(),
            fired: Vec::new(),
        }
    }
}

impl<C> FrameCallbacks<C> {
    fn insert(&mut self, handle: FrameHandle, callback: C) {
        self.live.insert(handle, callback);
    }

    fn mark_fired(&mut self, handle: FrameHandle) {
        self.fired.push(handle);
    }

    /// Drops every callback marked as fired. Returns how many were dropped.
    fn release_fired(&mut self) -> usize {
        let mut released = 0;
        for handle in self.fired.drain(..) {
            if self.live.remove(&handle).is_some() {
                released += 1;
            }
        }
        released
    }

    /// Drops the callback of a frame that will never fire.
    fn cancel(&mut self, handle: FrameHandle) -> bool {
        self.live.remove(&handle).is_some()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.live.len()
    }
}

impl Host for WebHost {
    type Surface = ShadowSurface;

    fn attach_surface(
        &mut self,
        instance: &InstanceId,
        tag_name: &str,
    ) -> Result<Self::Surface, HostError> {
        let element = self
            .document
            .create_element(tag_name)
            .map_err(|error| host_error(&error))?;
        element
            .set_attribute(INSTANCE_ATTRIBUTE, instance.as_str())
            .map_err(|error| host_error(&error))?;
        let root = element
            .attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))
            .map_err(|error| host_error(&error))?;
        self.hosts.insert(instance.clone(), element);
        Ok(ShadowSurface {
            document: self.document.clone(),
            root,
        })
    }
}

/// An open shadow root.
#[derive(Debug, Clone)]
pub struct ShadowSurface {
    document: Document,
    root: ShadowRoot,
}

impl ShadowSurface {
    /// The underlying shadow root.
    #[must_use]
    pub const fn root(&self) -> &ShadowRoot {
        &self.root
    }

    fn clear(&self) -> Result<(), JsValue> {
        while let Some(child) = self.root.first_child() {
            self.root.remove_child(&child)?;
        }
        Ok(())
    }

    fn build(&self, node: &Node) -> Result<web_sys::Node, JsValue> {
        match node {
            Node::Text(text) => Ok(self.document.create_text_node(text).into()),
            Node::Markup(markup) => {
                let template: HtmlTemplateElement =
                    self.document.create_element("template")?.dyn_into()?;
                template.set_inner_html(markup);
                Ok(template.content().into())
            }
            Node::Element {
                tag,
                attributes,
                children,
            } => {
                let element = self.document.create_element(tag)?;
                for (name, value) in attributes {
                    element.set_attribute(name, value)?;
                }
                for child in children {
                    element.append_child(&self.build(child)?)?;
                }
                Ok(element.into())
            }
        }
    }
}

impl Surface for ShadowSurface {
    fn set_markup(&mut self, markup: &str) -> Result<(), SurfaceError> {
        self.root.set_inner_html(markup);
        Ok(())
    }

    fn replace_children(&mut self, nodes: Vec<Node>) -> Result<(), SurfaceError> {
        self.clear().map_err(|error| surface_error(&error))?;
        for node in &nodes {
            let built = self.build(node).map_err(|error| surface_error(&error))?;
            self.root
                .append_child(&built)
                .map_err(|error| surface_error(&error))?;
        }
        Ok(())
    }

    fn append(&mut self, node: Node) -> Result<(), SurfaceError> {
        let built = self.build(&node).map_err(|error| surface_error(&error))?;
        self.root
            .append_child(&built)
            .map_err(|error| surface_error(&error))?;
        Ok(())
    }

    fn markup(&self) -> String {
        self.root.inner_html()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_callbacks_are_dropped() {
        let token = Rc::new(());
        let mut frames = FrameCallbacks::default();
        frames.insert(FrameHandle(1), Rc::clone(&token));
        frames.insert(FrameHandle(2), Rc::clone(&token));
        assert_eq!(Rc::strong_count(&token), 3);

        assert!(frames.cancel(FrameHandle(1)));
        assert!(!frames.cancel(FrameHandle(1)));
        assert_eq!(Rc::strong_count(&token), 2);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn fired_callbacks_are_dropped_on_the_next_release() {
        let token = Rc::new(());
        let mut frames = FrameCallbacks::default();
        frames.insert(FrameHandle(7), Rc::clone(&token));
        frames.mark_fired(FrameHandle(7));
        assert_eq!(Rc::strong_count(&token), 2);

        assert_eq!(frames.release_fired(), 1);
        assert_eq!(Rc::strong_count(&token), 1);
        assert_eq!(frames.len(), 0);
        assert_eq!(frames.release_fired(), 0);
    }

    #[test]
    fn cancelling_after_firing_is_harmless() {
        let mut frames = FrameCallbacks::default();
        frames.insert(FrameHandle(3), "render");
        frames.mark_fired(FrameHandle(3));
        assert!(frames.cancel(FrameHandle(3)));
        assert_eq!(frames.release_fired(), 0);
    }
}
