//! Client session state machine
//!
//! Connecting -> Registering -> Idle -> AwaitingFeedback -> {Idle | done}.
//! A command line is validated locally before anything touches the network;
//! once a frame is sent, the very next frame from the server is its
//! feedback. Frames arriving while no command is outstanding are unsolicited
//! chat messages.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::command::{parse_command, Command};
use crate::error::AppError;
use crate::frame::{write_frame, FrameReader};
use crate::name::is_valid_name;
use crate::render;
use crate::server::{FEEDBACK_FAILED, FEEDBACK_SUCCEED};

/// What one input line amounted to
///
/// Lines rejected locally come back with `ok: false` without any network
/// I/O, rendered the same way as a server-side rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Parse failure; nothing was sent
    InvalidInput,
    /// A create_group request and whether it succeeded
    CreateGroup { group: String, ok: bool },
    /// A send request and whether it succeeded
    Send { target: String, ok: bool },
    /// The who listing: sorted comma-joined names, possibly empty
    Who { names: String },
    /// The server confirmed our exit; shut down with status 0
    Exited,
}

/// Local create_group validation: valid group name, valid member names, and
/// at least one member who is not the sender
pub fn validate_create_group(own_name: &str, group: &str, members: &[String]) -> bool {
    is_valid_name(group)
        && members.iter().all(|m| is_valid_name(m))
        && members.iter().any(|m| m != own_name)
}

/// Local send validation: valid target name, not addressed to ourselves
pub fn validate_send(own_name: &str, target: &str) -> bool {
    is_valid_name(target) && target != own_name
}

/// A registered client session
#[derive(Debug)]
pub struct Session {
    name: String,
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    frames: FrameReader,
}

impl Session {
    /// Connect and register under `name`
    ///
    /// Sends the identity frame and blocks for exactly one response frame.
    /// `Failed` means the name is taken and the session never starts.
    pub async fn connect(name: String, addr: &str) -> Result<Self, AppError> {
        let stream = TcpStream::connect(addr).await.map_err(AppError::Connection)?;
        let (mut reader, mut writer) = stream.into_split();
        let mut frames = FrameReader::new();

        write_frame(&mut writer, &name).await?;
        let feedback = frames.read_frame(&mut reader).await?;
        if feedback == FEEDBACK_FAILED {
            return Err(AppError::DuplicateName);
        }
        debug!("registered as {}", name);

        Ok(Self {
            name,
            reader,
            writer,
            frames,
        })
    }

    /// Run one input line through the state machine
    ///
    /// Valid commands are framed, sent, and matched with the next feedback
    /// frame; invalid ones never leave the process.
    pub async fn execute_line(&mut self, line: &str) -> Result<Outcome, AppError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let command = parse_command(line);

        match &command {
            Command::Invalid => return Ok(Outcome::InvalidInput),
            Command::CreateGroup { group, members } => {
                if !validate_create_group(&self.name, group, members) {
                    return Ok(Outcome::CreateGroup {
                        group: group.clone(),
                        ok: false,
                    });
                }
            }
            Command::Send { target, .. } => {
                if !validate_send(&self.name, target) {
                    return Ok(Outcome::Send {
                        target: target.clone(),
                        ok: false,
                    });
                }
            }
            Command::Who | Command::Exit => {}
        }

        // AwaitingFeedback: the next server frame answers this command.
        write_frame(&mut self.writer, line).await?;
        let feedback = self.frames.read_frame(&mut self.reader).await?;

        match command {
            Command::CreateGroup { group, .. } => Ok(Outcome::CreateGroup {
                group,
                ok: feedback == FEEDBACK_SUCCEED,
            }),
            Command::Send { target, .. } => Ok(Outcome::Send {
                target,
                ok: feedback == FEEDBACK_SUCCEED,
            }),
            Command::Who => Ok(Outcome::Who { names: feedback }),
            Command::Exit => {
                if feedback == FEEDBACK_SUCCEED {
                    Ok(Outcome::Exited)
                } else {
                    Err(AppError::ExitRejected)
                }
            }
            Command::Invalid => unreachable!("filtered above"),
        }
    }

    /// Receive one unsolicited inbound chat message
    pub async fn recv_message(&mut self) -> Result<String, AppError> {
        self.frames.read_frame(&mut self.reader).await
    }

    /// Drive the interactive loop: stdin lines and server frames
    ///
    /// Returns only after a confirmed exit (Ok, exit status 0) or a fatal
    /// error. When stdin closes the session keeps receiving messages until
    /// the server goes away.
    pub async fn run(mut self) -> Result<(), AppError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("stdin closed; receive-only from here");
                        loop {
                            let payload = self.frames.read_frame(&mut self.reader).await?;
                            render::message(&payload);
                        }
                    };
                    match self.execute_line(&line).await? {
                        Outcome::Exited => {
                            render::unregistered();
                            return Ok(());
                        }
                        outcome => render::outcome(&outcome),
                    }
                }
                payload = self.frames.read_frame(&mut self.reader) => {
                    render::message(&payload?);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_group_requires_valid_names() {
        assert!(validate_create_group("alice", "team", &names(&["bob", "carol"])));
        assert!(!validate_create_group("alice", "te am", &names(&["bob"])));
        assert!(!validate_create_group("alice", "team", &names(&["bo b"])));
        assert!(!validate_create_group("alice", "team", &names(&["bob", ""])));
    }

    #[test]
    fn test_create_group_needs_a_member_besides_sender() {
        assert!(!validate_create_group("alice", "team", &names(&["alice"])));
        assert!(!validate_create_group("alice", "team", &names(&["alice", "alice"])));
        assert!(validate_create_group("alice", "team", &names(&["alice", "bob"])));
    }

    #[test]
    fn test_send_validation() {
        assert!(validate_send("alice", "bob"));
        assert!(!validate_send("alice", "alice"));
        assert!(!validate_send("alice", "b b"));
        assert!(!validate_send("alice", ""));
    }
}
