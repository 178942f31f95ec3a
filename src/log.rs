//! Subscriber installation for the `tracing` events emitted by the runtime.
//!
//! Element instances log through `tracing` under the `ezelement` target.
//! Nothing is printed until a subscriber is installed; [`init`] installs a
//! formatting subscriber filtered by `RUST_LOG`.

use std::sync::Once;

use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

static TRACING_INSTALLED: Once = Once::new();

/// Installs the global subscriber (idempotent).
///
/// Instances still gate their own messages with their
/// [`LogLevel`](crate::LogLevel); the filter only decides what reaches the
/// output. On `wasm32` panics are forwarded to the browser console as well.
pub fn init() {
    TRACING_INSTALLED.call_once(|| {
        #[cfg(target_arch = "wasm32")]
        console_error_panic_hook::set_once();

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let result = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_filter(filter))
            .try_init();

        if result.is_err() {
            eprintln!("ezelement: a global tracing subscriber is already installed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        assert!(TRACING_INSTALLED.is_completed());
    }
}
