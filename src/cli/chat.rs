//! Interactive chat loop.
//!
//! The loop is the primary context: it owns the [`Transcript`], reads lines
//! from stdin, starts a background run per message, and applies whatever the
//! runs and the presentation observer post back to it.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::adapters::presentation::{ChatBubble, PresentationObserver, Transcript, SENDER_BOT};
use crate::config::ResolvedConfig;
use crate::core::{primary, BackgroundRunner, ChatPipeline, Completion, RunControl};

const WELCOME: &str = "Hello! How can I help you today?";
const QUIT_COMMAND: &str = "/quit";

enum Wake {
    Line(Option<String>),
    Posted(bool),
}

/// Run the chat session until `/quit` or end of input
pub async fn run(config: &ResolvedConfig) -> Result<()> {
    let (context, mut queue) = primary::channel::<Transcript>();

    let mut bus = super::bus_with_file_log(config)?;
    bus.register(Arc::new(PresentationObserver::new(context.clone())));
    let runner = BackgroundRunner::new(ChatPipeline::new(config.responder.clone(), bus));

    info!(log_file = %config.log_file.display(), "Chat session started");

    let mut transcript = Transcript::new();
    transcript.push(ChatBubble::new(SENDER_BOT, WELCOME));
    render(&mut transcript);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_closed = false;
    let mut runs: Vec<RunControl> = Vec::new();

    loop {
        let wake = tokio::select! {
            line = lines.next_line(), if !input_closed => {
                Wake::Line(line.context("Failed to read input")?)
            }
            alive = queue.next(&mut transcript) => Wake::Posted(alive),
        };

        match wake {
            Wake::Line(Some(text)) => {
                let text = text.trim_end().to_string();
                if text.trim() == QUIT_COMMAND {
                    break;
                }
                if text.trim().is_empty() {
                    continue;
                }

                transcript.push_user(text.clone());
                let control = runner.spawn_into(text, &context, on_completion);
                debug!(run = %control.id(), "Submitted message");
                runs.push(control);
            }
            Wake::Line(None) => input_closed = true,
            Wake::Posted(false) => break,
            Wake::Posted(true) => {
                queue.drain(&mut transcript);
                runs.retain(|control| !control.is_finished());
            }
        }

        render(&mut transcript);
        if input_closed && transcript.pending_replies() == 0 {
            break;
        }
    }

    for control in runs.iter().filter(|c| !c.is_finished() && !c.is_cancelled()) {
        control.cancel();
    }
    info!("Chat session ended");
    Ok(())
}

/// Applied on the primary context once a run finishes
fn on_completion(transcript: &mut Transcript, completion: Completion) {
    let text = match completion {
        Ok(outcome) => outcome.into_text(),
        Err(e) => format!("❌ Error: {}", e),
    };
    transcript.push_reply(ChatBubble::new(SENDER_BOT, text));
}

fn render(transcript: &mut Transcript) {
    for bubble in transcript.take_unrendered() {
        println!("{}\n", bubble.render());
    }
}
