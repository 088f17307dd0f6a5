//! framechat: a small fixed-frame TCP chat service
//!
//! Named clients connect to one central server, send direct or group
//! messages, list connected users, and leave cleanly. Every logical message
//! travels as one fixed-size, NUL-padded frame.
//!
//! # Architecture
//! All server state lives in one `ChatServer` actor fed by `mpsc` channels:
//! - Each connection has a handler task pumping frames to and from the actor
//! - Registry mutation happens strictly one command at a time, no locks
//! - The client runs a symmetric session state machine over the same wire
//!   protocol: one outstanding command, one feedback frame
//!
//! # Example
//! ```ignore
//! use framechat::Server;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), framechat::AppError> {
//!     let server = Server::bind("127.0.0.1:8875").await?;
//!     server.run().await
//! }
//! ```

pub mod command;
pub mod error;
pub mod frame;
pub mod handler;
pub mod name;
pub mod registry;
pub mod render;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use command::{parse_command, Command};
pub use error::AppError;
pub use frame::{FrameReader, FRAME_LEN, MAX_PAYLOAD_LEN};
pub use handler::handle_connection;
pub use name::{is_valid_name, MAX_NAME_LEN};
pub use registry::{ClientEntry, Registry, MAX_GROUPS};
pub use server::{ChatServer, Server, ServerCommand, FEEDBACK_FAILED, FEEDBACK_SUCCEED};
pub use session::{Outcome, Session};
pub use types::ConnId;
