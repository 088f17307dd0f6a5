//! Presentation layer
//!
//! All user-facing text lives here; the state machines never print. Kept
//! deliberately thin: plain stdout for chat output, stderr for errors.

use crate::session::Outcome;

/// Successful connection and registration
pub fn connected() {
    println!("Connected successfully.");
}

/// Registration rejected: the name is already in use
pub fn duplicate_name() {
    println!("Client name is already in use.");
}

/// Could not reach or set up the server
pub fn failed_connection() {
    println!("Failed to connect the server.");
}

/// Bad or unparseable input line
pub fn invalid_input() {
    println!("ERROR: Invalid input.");
}

/// An inbound chat message, printed verbatim
pub fn message(text: &str) {
    println!("{text}");
}

/// Confirmed unregistration, just before a clean shutdown
pub fn unregistered() {
    println!("Unregistered successfully.");
}

/// Render the outcome of one executed command line
pub fn outcome(outcome: &Outcome) {
    match outcome {
        Outcome::InvalidInput => invalid_input(),
        Outcome::CreateGroup { group, ok: true } => {
            println!("Group \"{group}\" was created successfully.");
        }
        Outcome::CreateGroup { group, ok: false } => {
            println!("ERROR: failed to create group \"{group}\".");
        }
        Outcome::Send { ok: true, .. } => {
            println!("Sent successfully.");
        }
        Outcome::Send { ok: false, .. } => {
            println!("ERROR: failed to send.");
        }
        Outcome::Who { names } => {
            println!("{names}");
        }
        Outcome::Exited => unregistered(),
    }
}

/// Graceful server shutdown via the EXIT control line
pub fn server_shutdown() {
    println!("EXIT command is typed: server is shutting down");
}

/// Server binary usage line
pub fn server_usage() {
    eprintln!("Usage: framechat-server <port>");
}

/// Client binary usage line
pub fn client_usage() {
    eprintln!("Usage: framechat-client <name> <host> <port>");
}
