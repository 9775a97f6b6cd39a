//! Interactive chat REPL with streaming output.

use crate::config::ChatConfig;
use anyhow::Result;
use client::{
    CancellationToken, Lifecycle, Message, StreamRequest, Transport, truncate_to_fit,
};
use futures_util::StreamExt;
use rustyline::error::ReadlineError;
use std::io::Write;
use std::pin::pin;

/// Fallback context window when the config does not pin one.
const DEFAULT_CONTEXT_LENGTH: usize = 8192;

/// Interactive chat REPL holding the conversation history.
pub struct ChatRepl {
    config: ChatConfig,
    transport: Transport,
    history: Vec<Message>,
    editor: rustyline::DefaultEditor,
}

impl ChatRepl {
    /// Create a new REPL for the given configuration.
    pub fn new(config: ChatConfig) -> Result<Self> {
        Ok(Self {
            config,
            transport: Transport::new(),
            history: Vec::new(),
            editor: rustyline::DefaultEditor::new()?,
        })
    }

    /// Run the interactive REPL loop.
    pub async fn run(&mut self) -> Result<()> {
        println!(
            "narwhal chat — {} via {}",
            self.config.model, self.config.base_url
        );
        println!("Ctrl+D to exit, Ctrl+C to cancel a response");

        loop {
            match self.editor.readline("> ") {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(&line);
                    self.turn(line).await?;
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Run one conversation turn against the backend.
    async fn turn(&mut self, line: String) -> Result<()> {
        self.history.push(Message::user(line));

        let context_length = self
            .config
            .context_length
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_CONTEXT_LENGTH);
        let window = truncate_to_fit(&self.config.system_prompt, &self.history, context_length);
        if window.truncated {
            tracing::debug!(
                "history truncated: kept {} of {} messages, ~{} tokens",
                window.final_count,
                window.original_count,
                window.estimated_tokens
            );
        }

        let cancel = CancellationToken::new();
        // A resume from suspend kills the connection under us; let the
        // lifecycle registry cancel the stream so the turn ends cleanly.
        let _watch = Lifecycle::global().watch_stream(cancel.clone());

        let request = StreamRequest {
            base_url: self.config.base_url.clone(),
            model: self.config.model.as_str().into(),
            system_prompt: self.config.system_prompt.clone(),
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            context_length: self.config.context_length,
            messages: window.messages,
            cancel: cancel.clone(),
            timeout_override: None,
        };

        let stream = self.transport.stream_chat(request);
        let mut stream = pin!(stream);
        let mut answer = String::new();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    // The stream reports the abort as its final item;
                    // keep draining until it does.
                    cancel.cancel();
                }
                item = stream.next() => match item {
                    Some(Ok(delta)) => {
                        if !delta.reasoning.is_empty() {
                            tracing::debug!("reasoning: {}", delta.reasoning);
                        }
                        if !delta.content.is_empty() {
                            print!("{}", delta.content);
                            std::io::stdout().flush()?;
                            answer.push_str(&delta.content);
                        }
                    }
                    Some(Err(e)) => {
                        println!();
                        eprintln!("{}", e.user_message());
                        tracing::debug!("classified {:?}: {e}", e.kind());
                        break;
                    }
                    None => {
                        println!();
                        break;
                    }
                },
            }
        }

        if answer.is_empty() {
            // Nothing came back; drop the user turn so a retry resends it.
            self.history.pop();
        } else {
            self.history.push(Message::assistant(answer));
        }
        Ok(())
    }
}
