//! Error types for the chat service
//!
//! One taxonomy shared by the server and client binaries. Covers both fatal
//! errors (process or connection termination) and business errors (a
//! `Failed` feedback frame). Invalid protocol input is not an error at all,
//! it is `Command::Invalid` and stays on the happy path.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad startup arguments (fatal, exit 1)
    #[error("usage error: {0}")]
    Usage(String),

    /// Resolve/connect/bind failure (fatal, exit 1)
    #[error("connection error: {0}")]
    Connection(#[source] std::io::Error),

    /// Read/write failure on an established stream (fatal, never retried)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the stream mid-frame
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Name collision at registration (fatal to the rejected client)
    #[error("name already taken")]
    DuplicateName,

    /// The server answered an exit request with anything but success
    #[error("exit rejected by server")]
    ExitRejected,

    /// A name that fails the shared validity rule
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The configured group cap is already reached
    #[error("group limit reached")]
    GroupLimit,

    /// A proposed group member is not a connected client
    #[error("unknown member: {0}")]
    UnknownMember(String),

    /// Internal channel to the server actor broken (fatal)
    #[error("channel send error")]
    ChannelSend,
}
