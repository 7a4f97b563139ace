//! Tracing bootstrap.
//!
//! All runtime components log through `tracing`; this module wires a
//! default subscriber for binaries and tests that want one. Library users
//! with their own subscriber simply skip [`init`].

use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a global subscriber: env-filtered fmt output plus span-trace
/// capture for diagnostics.
///
/// The filter honors `RUST_LOG` and defaults to `info`. Calling this more
/// than once (or after another subscriber was installed) is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(ErrorLayer::default())
        .try_init();
}
