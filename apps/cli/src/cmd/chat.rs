//! `narwhal chat` — interactive streaming chat.

use crate::config::ChatConfig;
use crate::repl::ChatRepl;
use anyhow::Result;

pub async fn run(config: ChatConfig) -> Result<()> {
    ChatRepl::new(config)?.run().await
}
