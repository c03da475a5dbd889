//! `run` and `repl` subcommand handlers.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use pagehand_config::Config;
use pagehand_protocols::{Command, Settings};
use pagehand_runtime::CommandResponse;
use pagehand_surface_cdp::CdpSurface;

use crate::register::build_pipeline;

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
enum ReplInput<'a> {
    Command(&'a str),
    Answer(&'a str),
    Confirm(bool),
    Quit,
    Empty,
}

/// Interpret a line; `yes`/`no` only mean something while a confirmation waits.
fn parse_line(line: &str, awaiting_confirmation: bool) -> ReplInput<'_> {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }
    if let Some(answer) = line.strip_prefix('?') {
        return ReplInput::Answer(answer.trim());
    }
    match line.to_ascii_lowercase().as_str() {
        "exit" | "quit" => ReplInput::Quit,
        "yes" | "y" if awaiting_confirmation => ReplInput::Confirm(true),
        "no" | "n" if awaiting_confirmation => ReplInput::Confirm(false),
        _ => ReplInput::Command(line),
    }
}

/// Human-readable rendering of a response.
fn render(response: &CommandResponse) -> String {
    let mut out = String::new();
    if response.requires_clarification {
        out.push_str(response.clarification_question.as_deref().unwrap_or(&response.message));
        for (i, option) in response.clarification_options.iter().enumerate() {
            out.push_str(&format!("\n  {}. {}", i + 1, option));
        }
        out.push_str("\n(answer with ?<your answer>)");
        return out;
    }
    if response.requires_confirmation {
        out.push_str(response.confirmation_message.as_deref().unwrap_or(&response.message));
        for action in &response.actions {
            out.push_str(&format!("\n  - {}", action.description));
        }
        out.push_str("\n(yes/no)");
        return out;
    }
    let marker = if response.success { "ok" } else { "failed" };
    out.push_str(&format!("[{}] {}", marker, response.message));
    out
}

fn print_response(response: &CommandResponse, settings: &Settings) {
    println!("{}", render(response));
    if settings.audio_feedback && !response.is_suspended() {
        print!("\x07");
    }
}

async fn resolve_target(
    surface: &CdpSurface,
    target: Option<String>,
) -> Result<String, Box<dyn std::error::Error>> {
    match target {
        Some(target) => Ok(target),
        None => {
            let page = surface.first_page().await?;
            info!("Using page {} ({})", page.id, page.url);
            Ok(page.id)
        }
    }
}

/// Run one command and print the outcome.
pub(crate) async fn run_once(
    config: &Config,
    target: Option<String>,
    text: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.settings()?;
    let (pipeline, surface) = build_pipeline(config, settings.provider).await?;
    let target = resolve_target(&surface, target).await?;

    let response = pipeline
        .process_command(Command::new(text, target), &settings)
        .await;
    print_response(&response, &settings);

    if response.success || response.is_suspended() {
        Ok(())
    } else {
        Err(response.message.into())
    }
}

/// Interactive loop over stdin.
pub(crate) async fn run_repl(
    config: &Config,
    target: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.settings()?;
    let (pipeline, surface) = build_pipeline(config, settings.provider).await?;
    let target = resolve_target(&surface, target).await?;
    println!("pagehand on {} (type 'exit' to quit)", target);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut awaiting_confirmation = false;

    while let Some(line) = lines.next_line().await? {
        let response = match parse_line(&line, awaiting_confirmation) {
            ReplInput::Empty => continue,
            ReplInput::Quit => break,
            ReplInput::Command(text) => {
                pipeline
                    .process_command(Command::new(text, target.clone()), &settings)
                    .await
            }
            ReplInput::Answer(answer) => {
                pipeline.submit_clarification(&target, answer, &settings).await
            }
            ReplInput::Confirm(approved) => {
                pipeline.confirm_action(&target, approved, &settings).await
            }
        };
        debug!(state = %response.state, "Command finished");
        awaiting_confirmation = response.requires_confirmation;
        print_response(&response, &settings);
    }

    debug!("{} session(s) open at exit", pipeline.sessions().len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("  ", false), ReplInput::Empty);
        assert_eq!(parse_line("scroll down", false), ReplInput::Command("scroll down"));
        assert_eq!(parse_line("? the blue one ", false), ReplInput::Answer("the blue one"));
        assert_eq!(parse_line("EXIT", false), ReplInput::Quit);
    }

    #[test]
    fn test_yes_no_only_while_confirming() {
        assert_eq!(parse_line("yes", true), ReplInput::Confirm(true));
        assert_eq!(parse_line("N", true), ReplInput::Confirm(false));
        assert_eq!(parse_line("yes", false), ReplInput::Command("yes"));
    }
}
