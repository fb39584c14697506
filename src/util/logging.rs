use tracing_subscriber::{fmt, EnvFilter};

/// Initializes tracing based on `RUST_LOG`, defaulting to `info`.
///
/// Output goes to stderr so that rendered conversation text on stdout stays clean.
pub fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
