use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging for the bot.
///
/// Default: info for our crates, warn for everything else. Can be
/// overridden with `RUST_LOG`.
pub fn init(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,sweep=info,sweep_core=info,sweep_telegram=info,{service_name}=info"
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .init();
}
