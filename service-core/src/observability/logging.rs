use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter(log_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level))
}

/// Install the global subscriber. Panics if one is already installed.
pub fn init_tracing(service_name: &str, log_level: &str, json: bool) {
    if let Err(e) = try_init_tracing(log_level, json) {
        eprintln!(
            "Failed to initialize tracing for service '{}': {}",
            service_name, e
        );
        panic!("Failed to initialize tracing: {}", e);
    }
    tracing::info!(service = service_name, "Tracing initialized");
}

/// Non-panicking variant for hosts that may already own a subscriber, and for tests.
pub fn try_init_tracing(
    log_level: &str,
    json: bool,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let registry = tracing_subscriber::registry().with(env_filter(log_level));

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(true)
                    .with_line_number(true)
                    .json()
                    .flatten_event(true),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    }
}
