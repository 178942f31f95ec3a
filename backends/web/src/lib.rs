//! Browser backend for `EZElement`.
//!
//! [`WebApp`] owns a [`Runtime`](ezelement_core::Runtime) over a [`WebHost`]:
//! every rendering instance gets an element host with an open shadow root,
//! render passes run in `requestAnimationFrame` callbacks, and the global
//! dispatch function (`window.__get_method_handler` by default) routes inline
//! event handlers back to the owning instance.
//!
//! ```ignore
//! let mut app = WebApp::builder().with_root_id("app").build()?;
//! let counter = app.mount(Counter, ElementInit::new().state("count", 0))?;
//! ```

mod app;
mod dom;
mod error;
mod host;

pub use app::{WebApp, WebAppBuilder};
pub use dom::DEFAULT_ROOT_ID;
pub use error::WebError;
pub use host::{INSTANCE_ATTRIBUTE, ShadowSurface, WebHost};
