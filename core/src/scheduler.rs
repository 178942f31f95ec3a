//! Render scheduling: one pending frame per instance, extra requests coalesce.

use crate::{
    InstanceId,
    host::{FrameHandle, FrameScheduler},
    log::{self, LogLevel},
};

/// Borrowed view of an instance's pending-render token and the host frame source.
pub(crate) struct RenderRequester<'a> {
    id: &'a InstanceId,
    pending: &'a mut Option<FrameHandle>,
    has_surface: bool,
    frames: &'a mut dyn FrameScheduler,
    log_level: LogLevel,
}

impl<'a> RenderRequester<'a> {
    pub(crate) fn new(
        id: &'a InstanceId,
        pending: &'a mut Option<FrameHandle>,
        has_surface: bool,
        frames: &'a mut dyn FrameScheduler,
        log_level: LogLevel,
    ) -> Self {
        Self {
            id,
            pending,
            has_surface,
            frames,
            log_level,
        }
    }

    pub(crate) fn reborrow(&mut self) -> RenderRequester<'_> {
        RenderRequester {
            id: self.id,
            pending: &mut *self.pending,
            has_surface: self.has_surface,
            frames: &mut *self.frames,
            log_level: self.log_level,
        }
    }

    pub(crate) const fn id(&self) -> &'a InstanceId {
        self.id
    }

    pub(crate) const fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Schedules a render pass for the next frame.
    ///
    /// Returns `true` only when a new frame was requested. Surface-less and
    /// already pending instances are silent no-ops.
    pub(crate) fn request(&mut self) -> bool {
        log::lifecycle(self.log_level, self.id, "renderNextFrame");
        if !self.has_surface || self.pending.is_some() {
            return false;
        }
        match self.frames.request_frame(self.id) {
            Ok(handle) => {
                *self.pending = Some(handle);
                true
            }
            Err(error) => {
                tracing::error!(target: "ezelement", instance = %self.id, %error, "failed to request animation frame");
                false
            }
        }
    }

    /// Cancels the pending frame, if any.
    pub(crate) fn cancel(&mut self) -> bool {
        self.pending.take().is_some_and(|handle| {
            self.frames.cancel_frame(handle);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    fn instance_id() -> InstanceId {
        crate::id::IdAllocator::default().next("x-test")
    }

    #[test]
    fn requests_coalesce_until_the_frame_fires() {
        let id = instance_id();
        let mut host = MemoryHost::new();
        let mut pending = None;
        let mut requester = RenderRequester::new(&id, &mut pending, true, &mut host, LogLevel::None);
        assert!(requester.request());
        assert!(!requester.request());
        assert!(!requester.reborrow().request());
        drop(requester);
        assert!(pending.is_some());
        assert_eq!(host.pending_frames(), 1);
    }

    #[test]
    fn surface_less_instances_never_request() {
        let id = instance_id();
        let mut host = MemoryHost::new();
        let mut pending = None;
        let mut requester = RenderRequester::new(&id, &mut pending, false, &mut host, LogLevel::None);
        assert!(!requester.request());
        assert_eq!(host.requested_frames(), 0);
    }

    #[test]
    fn failed_requests_leave_no_token() {
        let id = instance_id();
        let mut host = MemoryHost::new();
        host.refuse_frames(true);
        let mut pending = None;
        let mut requester = RenderRequester::new(&id, &mut pending, true, &mut host, LogLevel::All);
        assert!(!requester.request());
        drop(requester);
        assert!(pending.is_none());
    }

    #[test]
    fn cancel_removes_the_queued_frame() {
        let id = instance_id();
        let mut host = MemoryHost::new();
        let mut pending = None;
        let mut requester = RenderRequester::new(&id, &mut pending, true, &mut host, LogLevel::None);
        requester.request();
        assert!(requester.cancel());
        assert!(!requester.cancel());
        drop(requester);
        assert_eq!(host.pending_frames(), 0);
    }
}
