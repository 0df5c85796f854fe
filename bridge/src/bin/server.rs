use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use duet_bridge::{load_env_file, start_server, BridgeState, EnvFile};
use duet_core::DuetConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional .env; real environment wins
    let env_file = load_env_file();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().compact().with_env_filter(filter).init();

    match env_file {
        EnvFile::Loaded(path) => {
            tracing::info!(target: "bridge", path = %path.display(), "Loaded .env")
        }
        EnvFile::Missing => {}
        EnvFile::Invalid(err) => tracing::warn!(
            target: "bridge",
            error = %err,
            "Ignoring malformed .env; entries from the bad line on were not applied"
        ),
    }

    let config = Arc::new(DuetConfig::from_env());
    let addr = config.server.socket_addr()?;

    // Model calls hold at most `workers` blocking threads at a time
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(config.model.workers.max(1) * 2)
        .build()?;

    runtime.block_on(async move {
        let state = BridgeState::from_config(config)?;
        start_server(addr, state).await
    })?;

    tracing::info!("Duet Bridge stopped");
    Ok(())
}
