use std::sync::Arc;

use sweep_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), sweep_core::Error> {
    sweep_core::logging::init("sweep");

    let cfg = Arc::new(Config::load()?);

    sweep_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| sweep_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
