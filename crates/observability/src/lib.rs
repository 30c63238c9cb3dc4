//! Process-wide tracing setup for the gate binary.

/// Initialize tracing with the format chosen by `MINIAUTH_LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    let format = std::env::var("MINIAUTH_LOG_FORMAT")
        .map(|v| LogFormat::parse(&v))
        .unwrap_or_default();
    self::tracing::init(format);
}

pub use self::tracing::LogFormat;

/// Subscriber construction (filters, formatters).
pub mod tracing;
