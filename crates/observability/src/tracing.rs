//! Subscriber initialization.
//!
//! `RUST_LOG` selects the filter; `LOG_FORMAT=pretty` switches from JSON lines
//! to human-readable output for local runs.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "info,fitshop_api=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("pretty") => Self::Pretty,
            _ => Self::Json,
        }
    }
}

/// Install the global subscriber using the environment.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    init_with(DEFAULT_DIRECTIVE, LogFormat::from_env());
}

/// Install the global subscriber with an explicit fallback filter used when
/// `RUST_LOG` is unset or invalid.
pub fn init_with(default_directive: &str, format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // try_init fails only when a subscriber is already installed.
    let _ = match format {
        LogFormat::Json => builder
            .json()
            .with_current_span(true)
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}
