//! Interactive line-based chat loop

use std::error::Error;
use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::cli::transcript::TranscriptPrinter;
use crate::core::config::Config;
use crate::core::conversation::SendError;
use crate::core::session::{AbortHandle, ChatSession, SendOutcome};

const PROMPT: &str = "> ";

/// Exit status conventionally used for an interrupt.
const INTERRUPTED: i32 = 130;

pub async fn run_chat(config: &Config) -> Result<(), Box<dyn Error>> {
    let mut session = ChatSession::from_config(config)?;
    spawn_interrupt_handler(session.abort_handle());

    eprintln!(
        "berrychat ({} backend at {}). Ctrl+C stops a reply, Ctrl+D quits.",
        config.backend_kind().as_str(),
        session.backend().endpoint()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printer = TranscriptPrinter::default();

    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            return Ok(());
        };

        printer.reset();
        match session
            .send_message(&line, |conversation| printer.print(conversation))
            .await
        {
            Ok(SendOutcome::Completed) => println!(),
            Ok(SendOutcome::Cancelled) => {
                if printer.printed_text() {
                    println!();
                }
                eprintln!("(stopped)");
            }
            Ok(SendOutcome::Failed) => {}
            Err(SendError::EmptyPrompt) => continue,
            Err(err @ SendError::Busy) => eprintln!("{err}"),
        }
    }
}

/// Ctrl+C aborts the reply in flight; when nothing is streaming it quits.
fn spawn_interrupt_handler(abort: AbortHandle) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if abort.abort() {
                debug!("reply aborted by interrupt");
            } else {
                println!();
                std::process::exit(INTERRUPTED);
            }
        }
    });
}
