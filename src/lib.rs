#![doc = include_str!("../README.md")]
#![allow(clippy::multiple_crate_versions)]

pub mod log;

#[doc(inline)]
pub use ezelement_core::*;

/// Browser backend: shadow-root surfaces, animation frames and the global
/// dispatch function.
#[cfg(feature = "web")]
pub use ezelement_web as web;

pub mod prelude {
    //! A collection of commonly used types for easy importing.
    //!
    //! # Example
    //!
    //! ```rust
    //! use ezelement::prelude::*;
    //!
    //! struct Greeting;
    //!
    //! impl Element for Greeting {
    //!     fn tag_name(&self) -> &str {
    //!         "x-greeting"
    //!     }
    //!
    //!     fn render(&mut self, cx: &mut RenderCx<'_>) -> Renderable {
    //!         let name = cx.state().value("name");
    //!         html!(cx, "<p>Hello, {}!</p>", name).into()
    //!     }
    //! }
    //!
    //! let mut runtime = Runtime::new(MemoryHost::new());
    //! let id = runtime
    //!     .create(Greeting, ElementInit::new().state("name", "world"))
    //!     .unwrap();
    //! runtime.connect(&id).unwrap();
    //! runtime.advance_frame().unwrap();
    //! assert_eq!(runtime.markup(id.as_str()).unwrap(), "<p>Hello, world!</p>");
    //! ```
    pub use ezelement_core::prelude::*;

    #[cfg(feature = "web")]
    pub use ezelement_web::{WebApp, WebAppBuilder};
}
