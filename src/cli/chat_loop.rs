//! Line-based interactive chat.
//!
//! Reads stdin line by line while stream messages arrive on the stream
//! channel. Answers for the selected conversation are printed as they
//! arrive; answers for other conversations are stored silently and
//! announced when they complete.

use std::error::Error;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::open_app;
use crate::commands::{process_input, CommandResult};
use crate::core::app::{App, StreamUpdate};
use crate::core::chat_stream::{ChatStreamService, StreamParams};

pub(crate) enum LineAction {
    Idle,
    Stream(StreamParams),
    Quit,
}

/// Run one line of user input through the command registry or send it.
pub(crate) fn dispatch_line(app: &mut App, line: &str) -> LineAction {
    if line.trim().is_empty() {
        return LineAction::Idle;
    }
    match process_input(app, line) {
        CommandResult::Continue => LineAction::Idle,
        CommandResult::Quit => LineAction::Quit,
        CommandResult::ProcessAsMessage(text) => {
            let semantic = app.semantic_thinking;
            match app.send_message(&text, semantic) {
                Ok(params) => LineAction::Stream(params),
                Err(err) => {
                    app.notify(err.to_string());
                    LineAction::Idle
                }
            }
        }
    }
}

/// Text to print for a stream update, if any.
pub(crate) fn format_update(app: &App, update: &StreamUpdate) -> Option<String> {
    match update {
        StreamUpdate::Chunk {
            text,
            is_current: true,
            ..
        } => Some(text.clone()),
        StreamUpdate::Failed {
            error,
            is_current: true,
            ..
        } => Some(format!("\n❌ {error}")),
        StreamUpdate::Finished {
            is_current: true, ..
        } => Some("\n".to_string()),
        StreamUpdate::Finished {
            session_id,
            is_current: false,
        } => {
            let session = app.store().get(session_id)?;
            let failed = session
                .messages
                .last()
                .is_some_and(|message| message.is_error);
            Some(if failed {
                format!("\n[response failed in '{}']\n", session.title)
            } else {
                format!(
                    "\n[answer ready in '{}'; /switch to read it]\n",
                    session.title
                )
            })
        }
        _ => None,
    }
}

fn print_notices(app: &mut App) {
    for notice in app.take_notices() {
        println!("{notice}");
    }
}

fn print_prompt(app: &App) -> io::Result<()> {
    let label = app
        .current_session()
        .map(|session| session.interface_type.as_str())
        .unwrap_or("no conversation");
    print!("{label}> ");
    io::stdout().flush()
}

fn print_banner(app: &App) {
    println!("jiuding {} (backend: {})", env!("CARGO_PKG_VERSION"), app.config().backend_label());
    match app.current_session() {
        Some(session) => println!(
            "Continuing '{}' ({} messages). Type /help for commands.",
            session.title,
            session.messages.len()
        ),
        None => println!("Start a conversation with /new <semantic|bss30|api>. Type /help for commands."),
    }
}

pub async fn run_chat(log_file: Option<String>) -> Result<(), Box<dyn Error>> {
    let mut app = open_app(log_file)?;
    let (stream_service, mut rx) = ChatStreamService::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_banner(&app);
    print_prompt(&app)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    println!();
                    break;
                };
                match dispatch_line(&mut app, &line) {
                    LineAction::Quit => break,
                    LineAction::Stream(params) => stream_service.spawn_stream(params),
                    LineAction::Idle => {
                        print_notices(&mut app);
                        print_prompt(&app)?;
                    }
                }
            }
            Some((message, stream_id)) = rx.recv() => {
                let update = app.handle_stream_message(message, stream_id);
                if let Some(text) = format_update(&app, &update) {
                    print!("{text}");
                    io::stdout().flush()?;
                }
                if matches!(update, StreamUpdate::Finished { .. }) {
                    print_prompt(&app)?;
                }
            }
        }
    }

    app.cancel_all_streams();
    Ok(())
}
