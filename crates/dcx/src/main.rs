use std::sync::Arc;

use dcx_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), dcx_core::Error> {
    dcx_core::logging::init("dcx")?;

    let cfg = Arc::new(Config::load()?);

    dcx_discord::router::run(cfg)
        .await
        .map_err(|e| dcx_core::Error::External(format!("discord bot failed: {e}")))?;

    Ok(())
}
