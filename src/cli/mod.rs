//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod character;
pub mod chat;
pub mod debug_log;
pub mod model_list;
pub mod settings;

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::auth::AuthManager;
use crate::cli::settings::{format_all, set_value, unset_value, SetContext, SettingRegistry};
use crate::core::config::data::path_display;
use crate::core::config::Settings;
use crate::core::debug_log::DebugRecorder;
use crate::core::store::DataStore;

#[derive(Parser)]
#[command(name = "liunian")]
#[command(version)]
#[command(about = "A terminal roleplay chat client for OpenAI-compatible APIs")]
#[command(
    long_about = "Liunian lets you define characters and chat with them through any \
OpenAI-compatible chat-completions endpoint. Messages typed in quick succession are \
collected and sent together after a quiet period, and replies may arrive as several \
short messages.\n\n\
Authentication:\n\
  Use 'liunian auth' to store an API key in your system keyring, or\n\
  'liunian set api-key <key>' to keep it in the config file.\n\n\
Environment Variables (fallback if no key configured):\n\
  OPENAI_API_KEY    Your API key\n\
  RUST_LOG          Diagnostic log filter (default: warn)\n\n\
Chat commands:\n\
  /send             Send collected messages now\n\
  /clear            Clear this character's chat history\n\
  /quit             Send anything still collected and exit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding characters, chat history and the debug log
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Chat with a character (default)
    Chat {
        /// Character id or name; prompts when omitted
        #[arg(short = 'c', long)]
        character: Option<String>,
    },
    /// Create, edit and list characters
    Character {
        #[command(subcommand)]
        command: CharacterCommands,
    },
    /// List models offered by the configured endpoint
    Models,
    /// Set configuration values, or show them all when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set (multiple words are joined with spaces)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Reset a configuration value to its default
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Store an API key in the system keyring
    Auth,
    /// Remove the API key from the system keyring
    Deauth,
    /// Inspect, export or clear the debug log
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
}

#[derive(Subcommand)]
pub enum CharacterCommands {
    /// Create a character
    Add {
        /// Display name
        name: String,
        /// Persona text; a friendly default is used when omitted
        #[arg(short, long, default_value = "")]
        persona: String,
        /// Avatar image file, or an existing data:/http(s) URL
        #[arg(short, long, default_value = "")]
        avatar: String,
    },
    /// Edit a character's name, persona or avatar
    Edit {
        /// Character id or name
        character: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        persona: Option<String>,
        /// Avatar image file, a data:/http(s) URL, or "" to remove
        #[arg(short, long)]
        avatar: Option<String>,
    },
    /// List characters
    List,
}

#[derive(Subcommand)]
pub enum LogCommands {
    /// Show whether logging is on and how much is stored
    Status,
    /// Write the log as text (default: ./debug_log_<timestamp>.txt)
    Export { path: Option<PathBuf> },
    /// Delete every log entry
    Clear,
}

/// Resolved locations for config and data.
pub struct Paths {
    pub config: PathBuf,
    pub store: DataStore,
}

impl Paths {
    fn resolve(args: &Args) -> Result<Self, Box<dyn Error>> {
        let config = match &args.config {
            Some(path) => path.clone(),
            None => Settings::default_path()?,
        };
        let store = match &args.data_dir {
            Some(dir) => DataStore::new(dir),
            None => DataStore::open_default()?,
        };
        Ok(Self { config, store })
    }

    pub fn load_settings(&self) -> Result<Settings, Box<dyn Error>> {
        Ok(Settings::load_from_path(&self.config)?)
    }

    pub fn load_recorder(&self, settings: &Settings) -> Result<DebugRecorder, Box<dyn Error>> {
        Ok(DebugRecorder::load(
            self.store.debug_log_path(),
            settings.enable_debug_log,
            settings.log_retention_days,
        )?)
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let args = Args::parse();
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let paths = Paths::resolve(&args)?;

    match args.command.unwrap_or(Commands::Chat { character: None }) {
        Commands::Chat { character } => chat::run_chat(&paths, character).await,
        Commands::Character { command } => character::run(&paths, command),
        Commands::Models => model_list::list_models(&paths).await,
        Commands::Set { key: None, .. } => {
            let settings = paths.load_settings()?;
            println!("⚙️  Settings ({}):", path_display(&paths.config));
            println!("{}", format_all(&SettingRegistry::new(), &settings));
            Ok(())
        }
        Commands::Set {
            key: Some(key),
            value,
        } => {
            let mut settings = paths.load_settings()?;
            let recorder = paths.load_recorder(&settings)?;
            let mut ctx = SetContext {
                settings: &mut settings,
                config_path: &paths.config,
                recorder: &recorder,
            };
            match set_value(&SettingRegistry::new(), &key, &value, &mut ctx) {
                Ok(message) => {
                    println!("{message}");
                    Ok(())
                }
                Err(err) => {
                    err.print();
                    std::process::exit(err.exit_code());
                }
            }
        }
        Commands::Unset { key } => {
            let mut settings = paths.load_settings()?;
            let recorder = paths.load_recorder(&settings)?;
            let mut ctx = SetContext {
                settings: &mut settings,
                config_path: &paths.config,
                recorder: &recorder,
            };
            match unset_value(&SettingRegistry::new(), &key, &mut ctx) {
                Ok(message) => {
                    println!("{message}");
                    Ok(())
                }
                Err(err) => {
                    err.print();
                    std::process::exit(err.exit_code());
                }
            }
        }
        Commands::Auth => {
            print!("Enter your API key: ");
            io::stdout().flush()?;
            let mut key = String::new();
            io::stdin().read_line(&mut key)?;
            if let Err(e) = AuthManager::new().store_key(&key) {
                eprintln!("❌ Authentication failed: {e}");
                std::process::exit(1);
            }
            println!("✅ API key stored in the system keyring");
            Ok(())
        }
        Commands::Deauth => match AuthManager::new().remove_key() {
            Ok(true) => {
                println!("✅ API key removed from the system keyring");
                Ok(())
            }
            Ok(false) => {
                println!("No API key was stored in the system keyring");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ Deauthentication failed: {e}");
                std::process::exit(1);
            }
        },
        Commands::Log { command } => debug_log::run(&paths, command),
    }
}
