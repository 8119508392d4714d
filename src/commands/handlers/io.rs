use super::{require_current, required_arg, usage_status};
use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::App;
use crate::core::config::data::parse_backend;
use crate::core::export::{default_export_filename, export_session};
use std::path::PathBuf;

const USAGE_LOG: &str = "Usage: /log [filename]";
const USAGE_EXPORT: &str = "Usage: /export [filename]";
const USAGE_BACKEND: &str = "Usage: /backend [custom|gemini]";

pub(crate) fn handle_log(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    match invocation.args_len() {
        0 => {
            let timestamp = chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S %Z")
                .to_string();
            let log_message = format!("Logging paused at {timestamp}");

            match app.logging.toggle_logging(&log_message) {
                Ok(message) => app.notify(message),
                Err(e) => app.notify(format!("Log error: {e}")),
            }
            CommandResult::Continue
        }
        1 => {
            let Some(filename) = required_arg(app, &invocation, 0, USAGE_LOG) else {
                return CommandResult::Continue;
            };
            match app.logging.set_log_file(filename.to_string()) {
                Ok(message) => {
                    let timestamp = chrono::Local::now()
                        .format("%Y-%m-%d %H:%M:%S %Z")
                        .to_string();
                    if let Err(e) = app
                        .logging
                        .log_message(&format!("## Logging started at {timestamp}"))
                    {
                        app.notify(format!("Log error: {e}"));
                    }
                    app.notify(message);
                }
                Err(e) => app.notify(format!("Logfile error: {e}")),
            }
            CommandResult::Continue
        }
        _ => usage_status(app, USAGE_LOG),
    }
}

pub(crate) fn handle_export(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args_len() > 1 {
        return usage_status(app, USAGE_EXPORT);
    }
    if require_current(app).is_none() {
        return CommandResult::Continue;
    }
    let Some(session) = app.current_session() else {
        return CommandResult::Continue;
    };

    let path = match invocation.arg(0) {
        Some(filename) => PathBuf::from(filename),
        None => PathBuf::from(default_export_filename(
            session,
            chrono::Local::now().date_naive(),
        )),
    };
    let notice = match export_session(session, &path) {
        Ok(()) => format!("Exported: {}", path.display()),
        Err(e) => format!("Export error: {e}"),
    };
    app.notify(notice);
    CommandResult::Continue
}

pub(crate) fn handle_backend(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(choice) = invocation.rest() else {
        let notice = describe_backend(app);
        app.notify(notice);
        return CommandResult::Continue;
    };
    let Some(use_custom) = parse_backend(choice) else {
        return usage_status(app, USAGE_BACKEND);
    };

    match app.set_use_custom_backend(use_custom) {
        Ok(()) => {
            let notice = describe_backend(app);
            app.notify(notice);
        }
        Err(e) => app.notify(format!("Backend switched for this session only: {e}")),
    }
    CommandResult::Continue
}

fn describe_backend(app: &App) -> String {
    let config = app.config();
    if config.use_custom_backend {
        "Backend: custom (each conversation's own endpoint)".to_string()
    } else {
        format!("Backend: gemini ({})", config.gemini_model())
    }
}
