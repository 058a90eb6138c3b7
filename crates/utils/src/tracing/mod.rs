use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vaultlink_core::VAULTLINK_LOG_VAR;

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// Reads the filter from `VAULTLINK_LOG`, falling back to `RUST_LOG` and then
/// `info`. Output is a compact formatter on stderr. Records emitted through
/// the `log` facade are forwarded as well. Calling this more than once returns
/// an error instead of replacing the installed subscriber.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_env(VAULTLINK_LOG_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new("info"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Create a span covering one batch resolution
pub fn batch_span(references: usize) -> Span {
    span!(Level::INFO, "batch", references = %references)
}

/// Create a span covering one remote call
pub fn remote_span(operation: &str, endpoint: &str) -> Span {
    span!(Level::DEBUG, "remote", operation = %operation, endpoint = %endpoint)
}
