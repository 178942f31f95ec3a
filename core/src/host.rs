//! Host abstraction: where rendering surfaces and animation frames come from.
//!
//! The browser backend implements these traits with shadow roots and
//! `requestAnimationFrame`. [`MemoryHost`] keeps everything in memory and only
//! fires frames when asked to, which makes render scheduling deterministic.

use std::collections::VecDeque;

use crate::{
    InstanceId,
    error::{HostError, SurfaceError},
    node::Node,
};

/// Opaque token for one requested animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

/// The isolated subtree an element renders into.
pub trait Surface {
    /// Replaces the whole content with parsed markup.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the markup.
    fn set_markup(&mut self, markup: &str) -> Result<(), SurfaceError>;

    /// Removes every child, then appends `nodes` in order.
    ///
    /// # Errors
    ///
    /// Returns an error if a node cannot be removed or inserted.
    fn replace_children(&mut self, nodes: Vec<Node>) -> Result<(), SurfaceError>;

    /// Appends one node after the existing children.
    ///
    /// # Errors
    ///
    /// Returns an error if the node cannot be inserted.
    fn append(&mut self, node: Node) -> Result<(), SurfaceError>;

    /// Serializes the current content.
    fn markup(&self) -> String;
}

/// Requests and cancels animation frames.
pub trait FrameScheduler {
    /// Asks for a frame in which `instance` will run its render pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot schedule frames.
    fn request_frame(&mut self, instance: &InstanceId) -> Result<FrameHandle, HostError>;

    /// Cancels a frame that has not fired yet. Unknown handles are ignored.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Everything the runtime needs from its environment.
pub trait Host: FrameScheduler {
    /// Surface type handed out by this host.
    type Surface: Surface;

    /// Allocates the rendering surface for a newly created instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot create the surface.
    fn attach_surface(&mut self, instance: &InstanceId, tag_name: &str)
    -> Result<Self::Surface, HostError>;
}

/// In-memory surface. Markup is kept as an unparsed fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySurface {
    children: Vec<Node>,
}

impl MemorySurface {
    /// Creates an empty surface.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            children: Vec::new(),
        }
    }

    /// Current children.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

impl Surface for MemorySurface {
    fn set_markup(&mut self, markup: &str) -> Result<(), SurfaceError> {
        self.children.clear();
        if !markup.is_empty() {
            self.children.push(Node::markup(markup));
        }
        Ok(())
    }

    fn replace_children(&mut self, nodes: Vec<Node>) -> Result<(), SurfaceError> {
        self.children = nodes;
        Ok(())
    }

    fn append(&mut self, node: Node) -> Result<(), SurfaceError> {
        self.children.push(node);
        Ok(())
    }

    fn markup(&self) -> String {
        self.children.iter().map(Node::to_markup).collect()
    }
}

/// Host whose frames fire only when the owner drains them.
///
/// Use [`Runtime::advance_frame`](crate::Runtime::advance_frame) to run every
/// frame requested so far.
#[derive(Debug, Default)]
pub struct MemoryHost {
    queue: VecDeque<(FrameHandle, InstanceId)>,
    next_handle: u64,
    requested: u64,
    refuse_frames: bool,
}

impl MemoryHost {
    /// Creates a host with an empty frame queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames requested and not yet fired or cancelled.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.queue.len()
    }

    /// Total number of frames ever requested.
    #[must_use]
    pub const fn requested_frames(&self) -> u64 {
        self.requested
    }

    /// Makes every following frame request fail, to exercise error paths.
    pub fn refuse_frames(&mut self, refuse: bool) {
        self.refuse_frames = refuse;
    }

    /// Removes and returns every queued frame, oldest first.
    pub fn take_frames(&mut self) -> Vec<(FrameHandle, InstanceId)> {
        self.queue.drain(..).collect()
    }
}

impl FrameScheduler for MemoryHost {
    fn request_frame(&mut self, instance: &InstanceId) -> Result<FrameHandle, HostError> {
        if self.refuse_frames {
            return Err(HostError::Backend("frames are refused".into()));
        }
        self.next_handle += 1;
        self.requested += 1;
        let handle = FrameHandle(self.next_handle);
        self.queue.push_back((handle, instance.clone()));
        Ok(handle)
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.queue.retain(|(queued, _)| *queued != handle);
    }
}

impl Host for MemoryHost {
    type Surface = MemorySurface;

    fn attach_surface(
        &mut self,
        _instance: &InstanceId,
        _tag_name: &str,
    ) -> Result<Self::Surface, HostError> {
        Ok(MemorySurface::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_markup_leaves_no_children() {
        let mut surface = MemorySurface::new();
        surface.append(Node::text("old")).expect("append");
        surface.set_markup("").expect("set markup");
        assert!(surface.children().is_empty());
        assert_eq!(surface.markup(), "");
    }

    #[test]
    fn cancelled_frames_leave_the_queue() {
        let mut host = MemoryHost::new();
        let mut ids = crate::id::IdAllocator::default();
        let first = ids.next("x-a");
        let second = ids.next("x-b");
        let handle = host.request_frame(&first).expect("frame");
        host.request_frame(&second).expect("frame");
        host.cancel_frame(handle);
        let frames = host.take_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].1, second);
        assert_eq!(host.requested_frames(), 2);
    }
}
