//! Core runtime for `EZElement` custom elements.
//!
//! A [`Runtime`] owns every element instance created against a [`Host`]. It
//! schedules at most one render pass per instance and animation frame, keeps
//! the reactive [`State`] of each instance, and records the callbacks passed
//! to the template helper so that markup like
//! `onclick="window.__get_method_handler('X-COUNTER__0', 'increment')(event)"`
//! can reach them again through [`Runtime::dispatch`].
//!
//! [`MemoryHost`] renders into memory and fires frames on demand; the web
//! backend renders into shadow roots.

#[macro_use]
mod macros;

mod config;
mod element;
pub mod error;
mod event;
mod handler;
pub mod host;
mod id;
mod log;
mod node;
mod runtime;
mod scheduler;
mod state;
mod template;


pub use config::{DEFAULT_DISPATCH_TARGET, RuntimeConfig};
pub use element::{Element, ElementCx, ElementInit, Lifecycle, RenderCx};
pub use error::{ConfigError, DispatchError, HostError, RuntimeError, SurfaceError};
pub use event::Event;
pub use handler::{Callback, HandlerSlot, HandlerTable};
pub use host::{FrameHandle, FrameScheduler, Host, MemoryHost, MemorySurface, Surface};
pub use id::InstanceId;
pub use log::LogLevel;
pub use node::{Node, Renderable, Template, stringify};
pub use runtime::{HandlerRef, Runtime, RuntimeBuilder};
pub use state::{State, StateMap, StateStore};
pub use template::{Arg, Html, dispatch_expression};

pub mod prelude {
    //! Commonly used types, importable with a single `use`.
    pub use crate::{
        Arg, Callback, Element, ElementCx, ElementInit, Event, LogLevel, MemoryHost, Node,
        RenderCx, Renderable, Runtime, Template, html,
    };
}
