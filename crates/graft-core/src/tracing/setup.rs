//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the Graft tracing/logging system.
///
/// Reads the `GRAFT_LOG` environment variable for per-module log levels.
/// Format: `GRAFT_LOG=graft_engine::streamer=debug,graft_storage=warn`
///
/// Falls back to `info` for the graft crates if `GRAFT_LOG` is not set or is invalid.
/// Calling it more than once is a no-op.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("GRAFT_LOG")
            .unwrap_or_else(|_| EnvFilter::new("graft_core=info,graft_storage=info,graft_engine=info"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true),
            )
            .with(filter)
            .init();
    });
}
