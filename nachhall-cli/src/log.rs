use tracing::Level;
use tracing_subscriber::{filter::Targets, fmt, prelude::*};

#[allow(unused_imports)]
pub use tracing::{debug, error, info, trace, warn};

/// Logs to stderr, `verbosity` raises the level of our own crates.
pub fn init(verbosity: u8) -> Result<(), tracing_subscriber::util::TryInitError> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let stderr_log = fmt::layer().compact().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(stderr_log)
        .with(
            Targets::default()
                .with_target("nachhall", level)
                .with_target("nachhall_core", level)
                .with_default(Level::WARN),
        )
        .try_init()
}
