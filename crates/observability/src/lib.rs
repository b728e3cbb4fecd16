//! Tracing/logging setup shared by the ingress and worker binaries.

/// Tracing configuration (filters, formatting).
pub mod tracing;

/// Initialize process-wide tracing for the named service.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(service: &'static str) {
    tracing::init(service);
}
