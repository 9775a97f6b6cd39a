//! `narwhal probe` — one-token connection test.

use crate::config::ChatConfig;
use anyhow::Result;
use client::Transport;

pub async fn run(config: ChatConfig) -> Result<()> {
    match Transport::new()
        .test_connection(&config.base_url, &config.model)
        .await
    {
        Ok(()) => {
            println!("{} is answering chat completions at {}", config.model, config.base_url);
            Ok(())
        }
        Err(e) => {
            tracing::debug!("probe failed, {:?}: {e}", e.kind());
            anyhow::bail!("{}", e.user_message())
        }
    }
}
