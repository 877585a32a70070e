//! Interactive chat loop on stdin/stdout.

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::debug;

use crate::auth::AuthManager;
use crate::character::{Character, CharacterService};
use crate::cli::settings::helpers::round_display;
use crate::cli::Paths;
use crate::core::context::AppContext;
use crate::core::transport::{HttpEndpoint, Transport};
use crate::core::turn::{TurnOrchestrator, TurnState};
use crate::ui::console::ConsoleSurface;

/// One line of chat input.
#[derive(Debug, PartialEq, Eq)]
pub enum ChatInput<'a> {
    Message(&'a str),
    Send,
    Clear,
    Quit,
    Unknown(&'a str),
}

impl<'a> ChatInput<'a> {
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        match trimmed {
            "/send" => ChatInput::Send,
            "/clear" => ChatInput::Clear,
            "/quit" | "/exit" => ChatInput::Quit,
            cmd if cmd.starts_with('/') && !cmd.contains(char::is_whitespace) && cmd.len() > 1 => {
                ChatInput::Unknown(cmd)
            }
            _ => ChatInput::Message(line),
        }
    }
}

pub async fn run_chat(paths: &Paths, character: Option<String>) -> Result<(), Box<dyn Error>> {
    let settings = paths.load_settings()?;
    let recorder = paths.load_recorder(&settings)?;
    let service = CharacterService::load(paths.store.clone())?;

    let character = match character {
        Some(key) => service.find(&key)?.clone(),
        None => pick_character(service.list())?,
    };

    let Some(resolved) = AuthManager::new().resolve(&settings) else {
        return Err("❌ No API key configured. Run 'liunian auth', 'liunian set api-key <key>', or set OPENAI_API_KEY.".into());
    };
    debug!(source = resolved.source.describe(), "api key resolved");

    let endpoint = HttpEndpoint::new(reqwest::Client::new(), settings.api_url.clone(), resolved.key);
    let transport = Transport::new(Arc::new(endpoint), recorder);

    println!("💬 Chatting with {} ({})", character.name, settings.model);
    if settings.enable_delay_send {
        println!(
            "   Messages are collected for {}s before sending; /send sends now.",
            round_display(settings.reply_delay)
        );
    }
    println!("   /clear clears this chat, /quit exits.");
    println!();

    let context = AppContext::new(
        settings,
        service.into_characters(),
        paths.store.load_transcripts()?,
    )
    .into_shared();
    let (orchestrator, flushes) = TurnOrchestrator::open(
        &character.id,
        context,
        paths.store.clone(),
        transport,
        Arc::new(ConsoleSurface::stdout()),
    )?;
    let orchestrator = Arc::new(orchestrator);

    let driver = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.drive(flushes).await }
    });
    let mut turns = JoinSet::new();
    let mut dispatch = |turn: String| {
        let orchestrator = Arc::clone(&orchestrator);
        turns.spawn(async move { orchestrator.run_turn(turn).await });
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match ChatInput::parse(&line) {
            ChatInput::Quit => break,
            ChatInput::Send => match orchestrator.flush_now() {
                Some(turn) => dispatch(turn),
                None if orchestrator.state() == TurnState::AwaitingResponse => {
                    println!("⏳ Still waiting for the last reply");
                }
                None => println!("Nothing to send"),
            },
            ChatInput::Clear => orchestrator.clear_transcript(),
            ChatInput::Unknown(cmd) => {
                println!("❓ Unknown command: {cmd} (try /send, /clear, /quit)");
            }
            ChatInput::Message(text) => {
                if let Some(turn) = orchestrator.submit(text) {
                    dispatch(turn);
                }
            }
        }
    }

    // Closing the input ends the flush channel; the driver finishes any
    // turn the timer already queued and then returns.
    if let Some(turn) = orchestrator.close_input() {
        dispatch(turn);
    }
    while turns.join_next().await.is_some() {}
    driver.await?;
    Ok(())
}

fn pick_character(characters: &[Character]) -> Result<Character, Box<dyn Error>> {
    match characters {
        [] => Err("No characters yet. Create one with: liunian character add <name>".into()),
        [only] => Ok(only.clone()),
        _ => {
            println!("Choose a character:");
            for (index, character) in characters.iter().enumerate() {
                println!("  {}. {}", index + 1, character.name);
            }
            print!("Select (1-{}): ", characters.len());
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            parse_selection(&input, characters.len())
                .map(|index| characters[index].clone())
                .ok_or_else(|| format!("Invalid selection: {}", input.trim()).into())
        }
    }
}

/// 1-based menu choice to a 0-based index.
fn parse_selection(input: &str, count: usize) -> Option<usize> {
    let choice = input.trim().parse::<usize>().ok()?;
    (1..=count).contains(&choice).then(|| choice - 1)
}
