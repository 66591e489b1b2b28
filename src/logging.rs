use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_FILTER_VAR: &str = "TREASURE_LOG";
pub const LOG_JSON_VAR: &str = "TREASURE_LOG_JSON";

/// Install the global subscriber. Logs always go to stderr: stdout carries
/// command output, and in the monitor it is the relay pipe back to the hub.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_env(LOG_FILTER_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let use_json = std::env::var(LOG_JSON_VAR)
        .map(|value| value == "1")
        .unwrap_or(false);

    if use_json {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .with_writer(std::io::stderr)
            .try_init();
    } else {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
