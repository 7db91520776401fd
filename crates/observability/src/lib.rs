//! Tracing/logging setup shared by binaries.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide logging, format taken from `INTELPLAT_LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    let format = std::env::var(tracing::LOG_FORMAT_ENV)
        .map(|v| LogFormat::parse(&v))
        .unwrap_or_default();
    tracing::init_with(format);
}
