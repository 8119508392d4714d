use super::CommandResult;
use crate::core::app::App;

pub type CommandHandler = fn(&mut App, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub input: &'a str,
    pub args: &'a str,
}

impl<'a> CommandInvocation<'a> {
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.split_whitespace().nth(index)
    }

    pub fn args_len(&self) -> usize {
        self.args.split_whitespace().count()
    }

    /// Everything after the command name, trimmed. `None` when empty.
    pub fn rest(&self) -> Option<&'a str> {
        Some(self.args.trim()).filter(|rest| !rest.is_empty())
    }
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

/// Commands whose name starts with `prefix`.
pub fn matching_commands(prefix: &str) -> Vec<&'static Command> {
    let prefix = prefix.to_ascii_lowercase();
    all_commands()
        .iter()
        .filter(|command| command.name.starts_with(&prefix))
        .collect()
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        usage: "/help",
        help: "Show available commands.",
        handler: super::handle_help,
    },
    Command {
        name: "new",
        usage: "/new <semantic|bss30|api> [url]",
        help: "Start a conversation on a query interface.",
        handler: super::handlers::session::handle_new,
    },
    Command {
        name: "list",
        usage: "/list",
        help: "List conversations, newest first.",
        handler: super::handlers::session::handle_list,
    },
    Command {
        name: "switch",
        usage: "/switch <n|id>",
        help: "Select a conversation by list number or id.",
        handler: super::handlers::session::handle_switch,
    },
    Command {
        name: "rename",
        usage: "/rename <title>",
        help: "Rename the current conversation.",
        handler: super::handlers::session::handle_rename,
    },
    Command {
        name: "delete",
        usage: "/delete [n|id]",
        help: "Delete a conversation (the current one by default).",
        handler: super::handlers::session::handle_delete,
    },
    Command {
        name: "show",
        usage: "/show",
        help: "Print the current conversation.",
        handler: super::handlers::session::handle_show,
    },
    Command {
        name: "semantic",
        usage: "/semantic [on|off]",
        help: "Toggle expert answers on semantic conversations.",
        handler: super::handlers::session::handle_semantic,
    },
    Command {
        name: "backend",
        usage: "/backend [custom|gemini]",
        help: "Show or switch where messages are sent.",
        handler: super::handlers::io::handle_backend,
    },
    Command {
        name: "export",
        usage: "/export [filename]",
        help: "Write the current conversation to a text file.",
        handler: super::handlers::io::handle_export,
    },
    Command {
        name: "log",
        usage: "/log [filename]",
        help: "Toggle transcript logging or set the log file.",
        handler: super::handlers::io::handle_log,
    },
    Command {
        name: "quit",
        usage: "/quit",
        help: "Leave the chat.",
        handler: super::handle_quit,
    },
];
