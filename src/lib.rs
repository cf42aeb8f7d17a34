pub mod config;
pub mod pipeline;

pub use pipeline::{EnrichedResult, Priority, TriageError, TriagePipeline};

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}
