//! Shared plumbing for the shoebox binaries.

pub mod commands;
pub mod sample;

/// Console tracing, filtered by `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
