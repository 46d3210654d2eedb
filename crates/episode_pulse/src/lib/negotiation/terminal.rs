use console::style;
use dialoguer::{Confirm, Input};

use super::{NegotiationEvent, Reply, SelectionStrategy, TitleCandidateSet};
use crate::error::Error;

/// Blocks on stdin; no timeout
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalStrategy;

fn prompt_error(e: dialoguer::Error) -> Error {
    Error::Prompt(e.to_string())
}

fn read_line(prompt: &str) -> Result<String, Error> {
    Input::<String>::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(prompt_error)
}

fn prompt_selection(titles: &[String]) -> Result<Reply, Error> {
    println!();
    println!("{}", style("TITLE OPTIONS").bold());
    for (i, title) in titles.iter().enumerate() {
        println!("  {} {title}", style(format!("{}.", i + 1)).cyan());
    }
    println!();

    loop {
        let input = read_line(&format!(
            "Select 1-{}, 'f' for feedback, 'TITLE: ...' for your own, 'q' to cancel",
            titles.len()
        ))?;

        match Reply::parse(&input) {
            Reply::Feedback(feedback) if feedback.is_empty() => {
                let follow_up = read_line("Feedback for new titles (or 'TITLE: Your Title')")?;
                return Ok(match Reply::parse(&follow_up) {
                    custom @ Reply::Custom(_) => custom,
                    _ => Reply::Feedback(follow_up.trim().to_string()),
                });
            }
            Reply::Invalid(_) => {
                println!("{}", style("Invalid choice, try again.").yellow());
            }
            reply => return Ok(reply),
        }
    }
}

fn prompt_confirmation(title: &str) -> Result<bool, Error> {
    Confirm::new()
        .with_prompt(format!("Use \"{title}\"?"))
        .default(true)
        .interact()
        .map_err(prompt_error)
}

impl SelectionStrategy for TerminalStrategy {
    async fn await_selection(&self, candidates: &TitleCandidateSet) -> Result<Reply, Error> {
        let titles = candidates.to_vec();
        tokio::task::spawn_blocking(move || prompt_selection(&titles))
            .await
            .map_err(|e| Error::Prompt(e.to_string()))?
    }

    async fn confirm(&self, title: &str) -> Result<bool, Error> {
        let title = title.to_string();
        tokio::task::spawn_blocking(move || prompt_confirmation(&title))
            .await
            .map_err(|e| Error::Prompt(e.to_string()))?
    }

    async fn notify(&self, event: NegotiationEvent<'_>) {
        match event {
            NegotiationEvent::Regenerating => {
                println!("{}", style("Generating new titles from your feedback...").dim());
            }
            NegotiationEvent::Selected(title) => {
                println!("{} {}", style("✓ Selected:").green(), style(title).bold());
            }
        }
    }
}
