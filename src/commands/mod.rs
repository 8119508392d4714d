mod handlers;
mod registry;

pub use handlers::session::{list_lines, session_line, short_id};
pub use registry::{all_commands, matching_commands, CommandInvocation};

use crate::core::app::App;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Continue,
    ProcessAsMessage(String),
    Quit,
}

pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();

    if !trimmed.starts_with('/') {
        return CommandResult::ProcessAsMessage(input.to_string());
    }

    let mut parts = trimmed[1..].splitn(2, char::is_whitespace);
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    if let Some(command) = registry::find_command(command_name) {
        let invocation = CommandInvocation {
            input: trimmed,
            args,
        };
        (command.handler)(app, invocation)
    } else {
        let suggestions = matching_commands(command_name);
        match suggestions.as_slice() {
            [] => app.notify(format!(
                "Unknown command: /{command_name}. Type /help for a list."
            )),
            _ => {
                let names = suggestions
                    .iter()
                    .map(|command| format!("/{}", command.name))
                    .collect::<Vec<_>>()
                    .join(", ");
                app.notify(format!("Unknown command: /{command_name}. Did you mean {names}?"));
            }
        }
        CommandResult::Continue
    }
}

pub(super) fn handle_help(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let width = all_commands()
        .iter()
        .map(|command| command.usage.len())
        .max()
        .unwrap_or(0);
    let mut help = String::from("Commands:");
    for command in all_commands() {
        help.push_str(&format!("\n  {:width$}  {}", command.usage, command.help));
    }
    help.push_str("\nAnything else is sent to the current conversation.");
    app.notify(help);
    CommandResult::Continue
}

pub(super) fn handle_quit(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Quit
}
