//! Incremental printing of the streamed reply for the line-oriented commands.

use std::io::{self, Write};

use crate::core::conversation::Conversation;
use crate::core::message::MessageStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Newly received reply text.
    Text(String),
    /// The reply failed; holds the localized error text.
    Error(String),
}

/// Tracks how much of the newest assistant reply has been written so each
/// update only emits what arrived since the previous one.
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    printed: usize,
    reported_error: bool,
}

impl TranscriptPrinter {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn update(&mut self, conversation: &Conversation) -> Option<Output> {
        let reply = conversation.last_assistant()?;
        match reply.status() {
            MessageStatus::Error => {
                if self.reported_error {
                    return None;
                }
                self.reported_error = true;
                Some(Output::Error(reply.content().to_string()))
            }
            _ => {
                let fresh = reply.content().get(self.printed..)?;
                if fresh.is_empty() {
                    return None;
                }
                self.printed = reply.content().len();
                Some(Output::Text(fresh.to_string()))
            }
        }
    }

    /// Applies [`Self::update`] and writes the result to stdout or stderr.
    pub fn print(&mut self, conversation: &Conversation) {
        match self.update(conversation) {
            Some(Output::Text(text)) => {
                let mut stdout = io::stdout().lock();
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            }
            Some(Output::Error(text)) => {
                if self.printed > 0 {
                    println!();
                }
                eprintln!("❌ {text}");
            }
            None => {}
        }
    }

    pub fn printed_text(&self) -> bool {
        self.printed > 0
    }
}
