use std::sync::Arc;

use anyhow::Context;
use engine_logging::engine_info;
use kindle_app::{logging, server};
use kindle_engine::{EngineConfig, Pipeline};
use tokio::net::TcpListener;

const DEFAULT_BIND: &str = "0.0.0.0:7071";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::initialize(
        logging::LogDestination::from_setting(std::env::var("TO_KINDLE_LOG").ok().as_deref()),
        logging::level_from_setting(std::env::var("LOG_LEVEL").ok().as_deref()),
    );

    let config = EngineConfig::from_env();
    engine_info!(
        "Scratch dir {:?}, converter {:?}, relay {}:{}",
        config.scratch_dir,
        config.converter.program,
        config.mail.smtp_host,
        config.mail.smtp_port
    );
    let pipeline = Arc::new(Pipeline::from_config(&config).context("opening dedup ledger")?);

    let bind = std::env::var("TO_KINDLE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;

    server::serve(listener, pipeline).await?;
    Ok(())
}
