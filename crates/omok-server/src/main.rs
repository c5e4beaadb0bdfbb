//! Runs the omok match server with settings from the environment.
//!
//! See [`omok::ServerConfig::from_env`] for the recognised variables.
//! Log verbosity follows `RUST_LOG` and defaults to `info`.

use std::sync::Arc;

use omok::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    if config.tokens.is_empty() {
        tracing::warn!("OMOK_TOKENS is empty, every login will be rejected");
    }

    let tokens: TokenTable = config.tokens.iter().cloned().collect();
    let store = Arc::new(JsonlStore::new(&config.store_path));

    let server = OmokServerBuilder::from_config(&config)
        .build(tokens, store)
        .await?;
    tracing::info!(store = %config.store_path.display(), "match records will be appended");

    server.run().await?;
    Ok(())
}
