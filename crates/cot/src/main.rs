use std::sync::Arc;

use cot_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), cot_core::Error> {
    cot_core::logging::init("cot")?;

    let cfg = Arc::new(Config::load()?);
    tracing::debug!(config = ?cfg, "Configuration loaded");

    cot_slack::router::run(cfg)
        .await
        .map_err(|e| cot_core::Error::External(format!("slack bot failed: {e:#}")))?;

    Ok(())
}
