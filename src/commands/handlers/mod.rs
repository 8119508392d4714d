pub(super) mod io;
pub(super) mod session;

use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::App;

pub(super) fn usage_status(app: &mut App, usage: &'static str) -> CommandResult {
    app.notify(usage);
    CommandResult::Continue
}

pub(super) fn required_arg<'a>(
    app: &mut App,
    invocation: &CommandInvocation<'a>,
    index: usize,
    usage: &'static str,
) -> Option<&'a str> {
    match invocation.arg(index) {
        Some(value) => Some(value),
        None => {
            app.notify(usage);
            None
        }
    }
}

/// Id of the selected conversation, or a hint on how to get one.
pub(super) fn require_current(app: &mut App) -> Option<String> {
    match app.store().current_id() {
        Some(id) => Some(id.to_string()),
        None => {
            app.notify("No conversation selected. Start one with /new <semantic|bss30|api>.");
            None
        }
    }
}
