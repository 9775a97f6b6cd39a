//! Narwhal CLI application — terminal chat against a configured
//! Ollama-style or OpenAI-compatible backend.

pub use cmd::{Cli, Command};

pub mod cmd;
pub mod config;
pub mod repl;
