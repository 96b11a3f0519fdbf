pub mod config;
pub mod models;
pub mod db;
pub mod pipeline;
pub mod intelligence; // Rule engine, risk table, health score
pub mod actions; // Confidence-gated medication / appointment creation

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Honors `RUST_LOG` when set, otherwise falls back to
/// [`config::default_log_filter`]. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_target(false)
        .try_init();
}
