//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments, sets up tracing and
//! dispatches to the interactive chat loop or one of the one-shot
//! subcommands.

pub mod chat_loop;
pub mod say;
pub mod settings;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cli::settings::helpers::{set_and_persist, unset_and_persist};
use crate::cli::settings::SettingRegistry;
use crate::commands::{list_lines, short_id};
use crate::core::app::App;
use crate::core::builtin_interfaces::load_builtin_interfaces;
use crate::core::config::data::{path_display, Config};
use crate::core::export::{default_export_filename, export_session, render_transcript};
use crate::core::session::InterfaceType;
use crate::core::storage::LocalStorage;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("VERGEN_GIT_SHA"),
    "\nbuilt: ",
    env!("VERGEN_BUILD_TIMESTAMP"),
    "\nrustc: ",
    env!("VERGEN_RUSTC_SEMVER"),
);

#[derive(Parser)]
#[command(name = "jiuding")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "A terminal chat client for private query backends and Gemini")]
#[command(
    long_about = "Jiuding keeps a list of conversations, each bound to one query interface \
(semantic conversion, BSS3.0 model Q&A or API lookup), and streams answers from that \
interface's endpoint. With the gemini backend selected, messages go to Google Gemini instead.\n\n\
Conversations are stored locally and restored on the next start.\n\n\
Environment Variables:\n\
  GEMINI_API_KEY    Gemini API key (API_KEY is also accepted)\n\
  JIUDING_LOG       Tracing filter, e.g. 'jiuding=debug'\n\n\
Chat commands:\n\
  /help             List all chat commands\n\
  /new <interface>  Start a conversation\n\
  /quit             Leave (Ctrl-D works too)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Append the chat transcript to this file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,

    /// Print debug diagnostics to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// Create a conversation and select it
    New {
        /// Interface: semantic, bss30 or api
        interface: InterfaceType,
        /// Endpoint to use instead of the built-in one
        #[arg(long)]
        url: Option<String>,
    },
    /// List stored conversations, newest first
    List,
    /// Print a conversation (the most recent one by default)
    Show {
        /// List number, id or id prefix
        session: Option<String>,
    },
    /// Send one message and print the streamed answer
    Say {
        /// Conversation to send to (the most recent one by default)
        #[arg(short, long)]
        session: Option<String>,
        /// Ask semantic interfaces for expert answers
        #[arg(long)]
        semantic: bool,
        /// Message text
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Rename a conversation
    Rename {
        /// List number, id or id prefix
        session: String,
        /// New title
        #[arg(trailing_var_arg = true, required = true)]
        title: Vec<String>,
    },
    /// Delete a conversation
    Delete {
        /// List number, id or id prefix
        session: String,
    },
    /// Write a conversation to a text file
    Export {
        /// Conversation to export (the most recent one by default)
        #[arg(short, long)]
        session: Option<String>,
        /// Output file; defaults to jiuding-<title>-<date>.txt
        file: Option<PathBuf>,
    },
    /// List the built-in query interfaces
    Interfaces,
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Show the current configuration
    Config,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(args))
}

/// Send tracing output to stderr. `JIUDING_LOG` overrides the level
/// chosen by `--verbose`.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("JIUDING_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "jiuding=debug" } else { "warn" })
    });
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

/// Load the config and stored conversations.
pub(crate) fn open_app(log_file: Option<String>) -> Result<App, Box<dyn Error>> {
    let config = Config::load()?;
    let storage = LocalStorage::open_default(config.data_dir.as_deref())?;
    Ok(App::new(config, storage, log_file)?.with_config_path(Config::config_path()))
}

/// Resolve an optional session reference, falling back to the newest
/// conversation.
pub(crate) fn resolve_session_id(
    app: &App,
    reference: Option<&str>,
) -> Result<String, Box<dyn Error>> {
    match reference {
        Some(reference) => Ok(app.store().resolve(reference)?.id.clone()),
        None => app
            .store()
            .current_id()
            .map(str::to_string)
            .ok_or_else(|| "No conversations yet. Create one with 'jiuding new <interface>'.".into()),
    }
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => chat_loop::run_chat(args.log).await,
        Commands::New { interface, url } => {
            let mut app = open_app(args.log)?;
            app.create_session(interface, url);
            if let Some(session) = app.current_session() {
                println!(
                    "✅ Created '{}' [{}] {}",
                    session.title,
                    short_id(&session.id),
                    session.backend_url
                );
            }
            Ok(())
        }
        Commands::List => {
            let app = open_app(args.log)?;
            let lines = list_lines(&app);
            if lines.is_empty() {
                println!("No conversations yet. Create one with 'jiuding new <interface>'.");
            }
            for line in lines {
                println!("{line}");
            }
            Ok(())
        }
        Commands::Show { session } => {
            let app = open_app(args.log)?;
            let id = resolve_session_id(&app, session.as_deref())?;
            if let Some(session) = app.store().get(&id) {
                print!("{}", render_transcript(session));
            }
            Ok(())
        }
        Commands::Say {
            session,
            semantic,
            prompt,
        } => say::run_say(prompt, session, semantic, args.log).await,
        Commands::Rename { session, title } => {
            let mut app = open_app(args.log)?;
            let id = resolve_session_id(&app, Some(&session))?;
            let title = title.join(" ");
            if !app.rename_session(&id, &title) {
                return Err("Title cannot be empty.".into());
            }
            println!("✅ Renamed to '{}'", title.trim());
            Ok(())
        }
        Commands::Delete { session } => {
            let mut app = open_app(args.log)?;
            let id = resolve_session_id(&app, Some(&session))?;
            if let Some(removed) = app.delete_session(&id) {
                println!("✅ Deleted '{}'", removed.title);
            }
            Ok(())
        }
        Commands::Export { session, file } => {
            let app = open_app(args.log)?;
            let id = resolve_session_id(&app, session.as_deref())?;
            let Some(session) = app.store().get(&id) else {
                return Ok(());
            };
            let path = file.unwrap_or_else(|| {
                PathBuf::from(default_export_filename(
                    session,
                    chrono::Local::now().date_naive(),
                ))
            });
            export_session(session, &path)?;
            println!("✅ Exported to {}", path_display(&path));
            Ok(())
        }
        Commands::Interfaces => {
            let config = Config::load()?;
            println!("Built-in interfaces:");
            for interface in load_builtin_interfaces() {
                println!(
                    "  {:<9} {}\n            {}\n            {}",
                    interface.id,
                    interface.display_name,
                    interface.description,
                    interface.endpoint(config.backend_url())
                );
            }
            Ok(())
        }
        Commands::Set { key, value } => {
            let registry = SettingRegistry::new();
            match set_and_persist(&registry, &key, &value) {
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
            let registry = SettingRegistry::new();
            match unset_and_persist(&registry, &key) {
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
        Commands::Config => {
            let config = Config::load()?;
            let registry = SettingRegistry::new();
            println!("jiuding configuration ({}):", path_display(Config::config_path()));
            for line in registry.format_all(&config) {
                println!("{line}");
            }
            Ok(())
        }
    }
}
