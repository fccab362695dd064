//! Tracing hooks for debugging list traffic.
//!
//! Enable with `--features tracing`. Without it the macros expand to
//! nothing, so the push and pop paths compile to the bare atomics.

/// Installs a global `tracing` subscriber that writes to stderr.
///
/// The filter is read from `RUST_LOG` and defaults to `axiom_llist=trace`.
/// Does nothing unless the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("axiom_llist=trace"));

    // A second call (e.g. from several tests) must not panic.
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(false)
                .with_line_number(false)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}

#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

#[cfg(feature = "tracing")]
pub(crate) use tracing::trace;

#[cfg(not(feature = "tracing"))]
macro_rules! trace_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use trace_noop as trace;
