//! Non-interactive "say" command

use std::error::Error;
use std::io::{self, Write};

use crate::cli::{open_app, resolve_session_id};
use crate::core::app::StreamUpdate;
use crate::core::chat_stream::ChatStreamService;

pub async fn run_say(
    prompt: Vec<String>,
    session: Option<String>,
    semantic: bool,
    log_file: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: jiuding say [--session S] [--semantic] <prompt>");
        std::process::exit(1);
    }

    let mut app = open_app(log_file)?;
    let id = resolve_session_id(&app, session.as_deref())?;
    app.select_session(&id)?;

    let params = app.send_message(&prompt, semantic)?;
    let expected_stream = params.stream_id;
    let (stream_service, mut rx) = ChatStreamService::new();
    stream_service.spawn_stream(params);

    let mut failure = None;
    while let Some((message, stream_id)) = rx.recv().await {
        if stream_id != expected_stream {
            continue;
        }
        match app.handle_stream_message(message, stream_id) {
            StreamUpdate::Chunk { text, .. } => {
                print!("{text}");
                io::stdout().flush()?;
            }
            StreamUpdate::Failed { error, .. } => failure = Some(error),
            StreamUpdate::Finished { .. } | StreamUpdate::Ignored => break,
        }
    }
    println!();

    if let Some(error) = failure {
        eprintln!("❌ Error: {error}");
        std::process::exit(1);
    }
    Ok(())
}
