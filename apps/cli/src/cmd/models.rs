//! `narwhal models` — list the models the backend serves.

use crate::config::ChatConfig;
use anyhow::Result;
use client::Transport;

pub async fn run(config: ChatConfig) -> Result<()> {
    match Transport::new().list_models(&config.base_url).await {
        Ok(models) => {
            for model in models {
                println!("{model}");
            }
            Ok(())
        }
        Err(e) => {
            tracing::debug!("model listing failed, {:?}: {e}", e.kind());
            anyhow::bail!("{}", e.user_message())
        }
    }
}
