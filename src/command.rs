//! Command grammar
//!
//! Turns one de-framed logical string into a tagged [`Command`]. The rest
//! of the system only consumes this contract; anything malformed or unknown
//! comes back as `Command::Invalid` and is never an error.

/// A parsed chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `create_group <name> <comma-list>` — a new group with the listed members
    CreateGroup { group: String, members: Vec<String> },
    /// `send <target> <message...>` — direct or group message
    Send { target: String, message: String },
    /// `who` — list connected client names
    Who,
    /// `exit` — unregister and leave
    Exit,
    /// Anything unrecognized or malformed
    Invalid,
}

/// Parse one input line into a [`Command`]
///
/// `who` and `exit` take no arguments; trailing tokens make them invalid.
/// The `send` message is everything after the target, preserved verbatim.
pub fn parse_command(input: &str) -> Command {
    let input = input.trim_end_matches(['\r', '\n']);
    let mut parts = input.splitn(3, ' ');
    let verb = parts.next().unwrap_or("");
    let arg = parts.next();
    let rest = parts.next();

    match (verb, arg, rest) {
        ("create_group", Some(group), Some(list)) => Command::CreateGroup {
            group: group.to_string(),
            members: list.split(',').map(str::to_string).collect(),
        },
        ("send", Some(target), Some(message)) => Command::Send {
            target: target.to_string(),
            message: message.to_string(),
        },
        ("who", None, None) => Command::Who,
        ("exit", None, None) => Command::Exit,
        _ => Command::Invalid,
    }
}
