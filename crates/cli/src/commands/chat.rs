//! `flightdeck chat`: interactive conversation with history.

use flightdeck_core::message::{Conversation, Message};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CommandResult, default_provider, load_config, request, stream_reply};

const SYSTEM_PROMPT: &str = "You are a helpful assistant running in a terminal. \
    If you don't know something, say so. Use concise language and avoid asking for more input.";

/// Messages kept in the conversation, system prompt included.
const MAX_MESSAGES: usize = 40;

pub async fn run(model: Option<String>) -> CommandResult {
    let config = load_config()?;
    let provider = default_provider(&config)?;
    let model_name = model.clone().unwrap_or_else(|| config.default_model.clone());

    println!();
    println!("  FlightDeck Chat");
    println!("  ===============");
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {model_name}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or press Ctrl+D to quit.");
    println!();

    let mut conv = Conversation::new();
    conv.push(Message::system(SYSTEM_PROMPT));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break; // EOF (Ctrl+D)
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if is_quit(text) {
            break;
        }

        conv.push(Message::user(text));
        conv.trim_to(MAX_MESSAGES);

        print!("\n  Assistant > ");
        let req = request(&config, model.clone(), conv.messages.clone());
        match stream_reply(provider.as_ref(), req).await {
            Ok(reply) => conv.push(Message::assistant(reply.trim())),
            Err(e) => {
                eprintln!("  [Error] {e}");
                // Forget the unanswered question.
                conv.messages.pop();
            }
        }
        println!();
    }

    println!();
    println!("  Goodbye! 👋");
    println!();
    Ok(())
}

fn is_quit(text: &str) -> bool {
    matches!(text.to_ascii_lowercase().as_str(), "exit" | "quit" | "/exit" | "/quit")
}
