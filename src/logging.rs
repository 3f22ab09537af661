use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "arc_timers_lib=info";

/// Installs the process-wide subscriber. `RUST_LOG` takes precedence over the
/// default directive.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let result = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .try_init();
    if let Err(err) = result {
        eprintln!("logging already initialised: {err}");
    }
}
