//! CLI command definitions and dispatch.

use crate::config;
use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod chat;
pub mod models;
pub mod probe;

/// Narwhal — local-first streaming chat client.
#[derive(Debug, Parser)]
#[command(name = "narwhal", version, about)]
pub struct Cli {
    /// Path to the client config file
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive chat with the configured backend
    Chat,
    /// List the models the backend serves
    Models,
    /// Probe the chat endpoint with a one-token request
    Probe,
}

impl Cli {
    /// Resolve configuration and run the selected command.
    pub async fn run(self) -> Result<()> {
        let config = config::resolve_config(self.config.as_deref())?;
        match self.command {
            Command::Chat => chat::run(config).await,
            Command::Models => models::run(config).await,
            Command::Probe => probe::run(config).await,
        }
    }
}
