//! Tracing setup for binaries and tests that embed the client.
//!
//! The library itself only emits events. Subscribers are installed by the
//! application, typically once at startup:
//!
//! ```rust,no_run
//! secretary::logging::init();
//! ```
//!
//! `RUST_LOG` overrides [`DEFAULT_FILTER`].

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "secretary=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a formatting subscriber. Panics if one is already installed.
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer())
        .init();
}

/// Like [`init`], but returns an error instead of panicking when a global
/// subscriber already exists. Safe to call from every test.
pub fn try_init() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_test_writer())
        .try_init()
}
