//! Tracing and logging (shared setup).

/// Initialize process-wide logging at `info` unless `RUST_LOG` says otherwise.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init("info");
}

/// Initialize process-wide logging with a caller-chosen default directive.
///
/// Interactive tools pass `"warn"` so routine session events stay quiet.
pub fn init_with_default(default_directive: &str) {
    tracing::init(default_directive);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
