//! One-shot "say" command

use std::error::Error;

use crate::cli::transcript::TranscriptPrinter;
use crate::core::config::Config;
use crate::core::conversation::SendError;
use crate::core::session::{ChatSession, SendOutcome};

pub async fn run_say(prompt: Vec<String>, config: &Config) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    let mut session = ChatSession::from_config(config)?;
    let mut printer = TranscriptPrinter::default();

    let outcome = match session
        .send_message(&prompt, |conversation| printer.print(conversation))
        .await
    {
        Ok(outcome) => outcome,
        Err(SendError::EmptyPrompt) => {
            eprintln!("Usage: berrychat say <prompt>");
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    match outcome {
        SendOutcome::Completed => {
            println!();
            Ok(())
        }
        SendOutcome::Failed | SendOutcome::Cancelled => std::process::exit(1),
    }
}
