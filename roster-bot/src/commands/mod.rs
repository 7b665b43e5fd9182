//! Read-only roster commands, e.g. `!mine` or `!whitelist`

mod help;
mod mine;
mod whitelist;

use crate::store::Store;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Show help: `help`
    Help,
    /// List the author's own entries: `mine`
    Mine,
    /// List every registered friend code once: `whitelist`
    Whitelist,
}

/// Parse a command from text starting with `prefix`. Returns None for text
/// without the prefix and for unknown commands.
pub fn parse(text: &str, prefix: &str) -> Option<Command> {
    let rest = text.trim().strip_prefix(prefix)?;
    let command = rest.split_whitespace().next()?.to_lowercase();

    log::debug!("Commands: Parsing '{}' -> '{}'", text.trim(), command);

    match command.as_str() {
        "help" | "?" => Some(Command::Help),
        "mine" | "me" => Some(Command::Mine),
        "whitelist" | "codes" => Some(Command::Whitelist),
        _ => None,
    }
}

/// Execute a command and return the reply text
pub fn execute(cmd: Command, author_id: &str, prefix: &str, store: &Store) -> Result<String, String> {
    match cmd {
        Command::Help => Ok(help::execute(prefix)),
        Command::Mine => mine::execute(author_id, store).map_err(|e| e.to_string()),
        Command::Whitelist => whitelist::execute(store).map_err(|e| e.to_string()),
    }
}
