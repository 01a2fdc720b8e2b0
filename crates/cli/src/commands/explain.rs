//! `flightdeck explain`: a short explanation of a failed shell command.

use flightdeck_core::Message;

use super::{CommandResult, default_provider, load_config, request};

const INSTRUCTIONS: &str = "Briefly explain the following error message. \
    Use 3 to 5 short lines in total. \
    Give only the most likely cause and one simple fix. \
    Write it as plain console output with no markdown.";

pub fn build_prompt(command: &str, error: &str) -> String {
    format!("Command: {command}\n\nError: {error}\n\nExplanation:")
}

/// Strip code formatting the model adds despite being asked not to.
pub fn clean_explanation(text: &str) -> String {
    text.replace("```", "").replace('`', "").trim().to_string()
}

pub async fn run(command: &str, error: &str) -> CommandResult {
    let config = load_config()?;
    let provider = default_provider(&config)?;

    let req = request(
        &config,
        None,
        vec![
            Message::system(INSTRUCTIONS),
            Message::user(build_prompt(command, error)),
        ],
    );
    let response = provider.complete(req).await?;
    println!("{}", clean_explanation(&response.message.content));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_command_and_error() {
        let prompt = build_prompt("cargo biuld", "error: no such command: `biuld`");
        assert!(prompt.starts_with("Command: cargo biuld\n\nError: error: no such command"));
        assert!(prompt.ends_with("Explanation:"));
    }

    #[test]
    fn code_fences_and_ticks_removed() {
        let raw = "```\nTypo in `biuld`.\nRun `cargo build`.\n```\n";
        assert_eq!(clean_explanation(raw), "Typo in biuld.\nRun cargo build.");
    }
}
