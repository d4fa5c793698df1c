//! Tracing initialisation for the `tlsgrade` binary.
//!
//! Logs go to stderr so the report on stdout stays clean. `RUST_LOG` takes
//! precedence over the level derived from `--verbose`.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. Later calls are ignored.
pub fn init_tracing(level: LevelFilter) {
    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .ok();
}

fn build_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing(LevelFilter::WARN);
        init_tracing(LevelFilter::DEBUG);
        tracing::info!("still running");
    }

    #[test]
    fn level_names_are_valid_directives() {
        for level in [
            LevelFilter::OFF,
            LevelFilter::ERROR,
            LevelFilter::INFO,
            LevelFilter::TRACE,
        ] {
            assert!(EnvFilter::try_new(level.to_string()).is_ok());
        }
    }
}
