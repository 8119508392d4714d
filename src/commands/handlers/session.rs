use super::{require_current, required_arg, usage_status};
use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::App;
use crate::core::export::render_transcript;
use crate::core::session::{ChatSession, InterfaceType};

const USAGE_NEW: &str = "Usage: /new <semantic|bss30|api> [url]";
const USAGE_SWITCH: &str = "Usage: /switch <n|id>";
const USAGE_RENAME: &str = "Usage: /rename <title>";
const USAGE_SEMANTIC: &str = "Usage: /semantic [on|off]";

pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// One row of the conversation list.
pub fn session_line(
    index: usize,
    session: &ChatSession,
    is_current: bool,
    is_streaming: bool,
) -> String {
    let marker = if is_current { '*' } else { ' ' };
    let updated = chrono::DateTime::from_timestamp_millis(session.updated_at)
        .map(|time| {
            time.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_default();
    let mut line = format!(
        "{marker} {:>2}. {}  [{}]  {}  {}",
        index + 1,
        session.title,
        session.interface_type,
        short_id(&session.id),
        updated
    );
    if is_streaming {
        line.push_str("  (streaming)");
    }
    line
}

pub fn list_lines(app: &App) -> Vec<String> {
    let current = app.store().current_id();
    app.store()
        .sessions()
        .iter()
        .enumerate()
        .map(|(index, session)| {
            session_line(
                index,
                session,
                current == Some(session.id.as_str()),
                app.is_streaming(&session.id),
            )
        })
        .collect()
}

pub(crate) fn handle_new(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(kind) = required_arg(app, &invocation, 0, USAGE_NEW) else {
        return CommandResult::Continue;
    };
    if invocation.args_len() > 2 {
        return usage_status(app, USAGE_NEW);
    }
    let interface_type = match kind.parse::<InterfaceType>() {
        Ok(interface_type) => interface_type,
        Err(err) => {
            app.notify(err);
            return CommandResult::Continue;
        }
    };

    app.create_session(interface_type, invocation.arg(1).map(str::to_string));
    if let Some(session) = app.current_session() {
        let notice = format!("Started '{}' ({})", session.title, session.backend_url);
        app.notify(notice);
    }
    CommandResult::Continue
}

pub(crate) fn handle_list(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let lines = list_lines(app);
    if lines.is_empty() {
        app.notify("No conversations yet. Start one with /new <semantic|bss30|api>.");
    } else {
        app.notify(lines.join("\n"));
    }
    CommandResult::Continue
}

pub(crate) fn handle_switch(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(reference) = invocation.rest() else {
        return usage_status(app, USAGE_SWITCH);
    };
    let id = match app.store().resolve(reference) {
        Ok(session) => session.id.clone(),
        Err(err) => {
            app.notify(err.to_string());
            return CommandResult::Continue;
        }
    };

    if let Err(err) = app.select_session(&id) {
        app.notify(err.to_string());
        return CommandResult::Continue;
    }
    if let Some(session) = app.current_session() {
        let notice = format!(
            "Switched to '{}' ({} messages)",
            session.title,
            session.messages.len()
        );
        app.notify(notice);
    }
    CommandResult::Continue
}

pub(crate) fn handle_rename(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(title) = invocation.rest() else {
        return usage_status(app, USAGE_RENAME);
    };
    let Some(id) = require_current(app) else {
        return CommandResult::Continue;
    };
    if app.rename_session(&id, title) {
        app.notify(format!("Renamed to '{title}'"));
    }
    CommandResult::Continue
}

pub(crate) fn handle_delete(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let id = match invocation.rest() {
        Some(reference) => match app.store().resolve(reference) {
            Ok(session) => session.id.clone(),
            Err(err) => {
                app.notify(err.to_string());
                return CommandResult::Continue;
            }
        },
        None => match require_current(app) {
            Some(id) => id,
            None => return CommandResult::Continue,
        },
    };

    if let Some(removed) = app.delete_session(&id) {
        let mut notice = format!("Deleted '{}'", removed.title);
        if let Some(current) = app.current_session() {
            notice.push_str(&format!("; now in '{}'", current.title));
        }
        app.notify(notice);
    }
    CommandResult::Continue
}

pub(crate) fn handle_show(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    if require_current(app).is_none() {
        return CommandResult::Continue;
    }
    if let Some(transcript) = app.current_session().map(render_transcript) {
        app.notify(transcript.trim_end().to_string());
    }
    CommandResult::Continue
}

pub(crate) fn handle_semantic(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let enabled = match invocation.rest().map(str::to_ascii_lowercase).as_deref() {
        None => !app.semantic_thinking,
        Some("on") => true,
        Some("off") => false,
        Some(_) => return usage_status(app, USAGE_SEMANTIC),
    };
    app.semantic_thinking = enabled;

    let mut notice = format!(
        "Semantic thinking {}",
        if enabled { "on" } else { "off" }
    );
    if enabled
        && app
            .current_session()
            .is_some_and(|s| !s.interface_type.supports_semantic_thinking())
    {
        notice.push_str(" (only applies to semantic conversations)");
    }
    app.notify(notice);
    CommandResult::Continue
}
