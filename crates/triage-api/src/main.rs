//! Binary entrypoint for the triage API server.
use tracing_subscriber::EnvFilter;
use triage_api::run;
use triage_core::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // TRIAGE_CONFIG, TRIAGE_ADDR / PORT and friends are read here
    let settings = Settings::load()?;
    run(settings).await?;
    Ok(())
}
