//! ChatServer actor implementation
//!
//! The central actor owning the client and group registries. Connection
//! handlers feed it commands over an mpsc channel; it mutates state and
//! queues response frames, strictly one command at a time. The actor is the
//! only place registry state lives, so the whole server runs without locks.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::error::AppError;
use crate::registry::{ClientEntry, Registry};
use crate::types::ConnId;

/// Feedback payload for an accepted command
pub const FEEDBACK_SUCCEED: &str = "Succeed";
/// Feedback payload for a rejected command
pub const FEEDBACK_FAILED: &str = "Failed";

/// Commands sent from connection handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// A connection presented its identity frame and wants to register
    Register {
        conn_id: ConnId,
        name: String,
        sender: mpsc::Sender<String>,
        ack: oneshot::Sender<Result<(), AppError>>,
    },
    /// A registered client sent one command frame
    Dispatch { sender_name: String, command: Command },
    /// A client's connection died without an Exit (read error or EOF)
    Disconnect { name: String },
    /// Graceful shutdown: drop every connection and stop the loop
    Shutdown,
}

/// The main ChatServer actor
pub struct ChatServer {
    registry: Registry,
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            registry: Registry::new(),
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Processes commands until a `Shutdown` arrives or all senders are
    /// dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            if matches!(cmd, ServerCommand::Shutdown) {
                break;
            }
            self.handle_command(cmd).await;
        }

        info!("ChatServer shutting down");
        // Dropping the registry drops every client's sender, which ends the
        // write tasks and closes the sockets.
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Register {
                conn_id,
                name,
                sender,
                ack,
            } => {
                self.handle_register(conn_id, name, sender, ack);
            }
            ServerCommand::Dispatch {
                sender_name,
                command,
            } => {
                self.handle_dispatch(sender_name, command).await;
            }
            ServerCommand::Disconnect { name } => {
                self.handle_disconnect(name);
            }
            ServerCommand::Shutdown => unreachable!("handled in run()"),
        }
    }

    /// Handle a registration attempt
    ///
    /// The name must not collide with a connected client or with a group;
    /// a client named like a group would break message routing.
    fn handle_register(
        &mut self,
        conn_id: ConnId,
        name: String,
        sender: mpsc::Sender<String>,
        ack: oneshot::Sender<Result<(), AppError>>,
    ) {
        let result = if self.registry.is_group(&name) {
            Err(AppError::DuplicateName)
        } else {
            self.registry.register(&name, ClientEntry::new(sender))
        };

        match &result {
            Ok(()) => info!("{} connected (conn {})", name, conn_id),
            Err(_) => warn!("rejected duplicate name '{}' (conn {})", name, conn_id),
        }
        debug!("total clients: {}", self.registry.client_count());

        let _ = ack.send(result);
    }

    /// Execute one parsed command against the registries
    async fn handle_dispatch(&mut self, sender_name: String, command: Command) {
        match command {
            Command::CreateGroup { group, members } => {
                self.handle_create_group(&sender_name, group, members).await;
            }
            Command::Send { target, message } => {
                self.handle_send(&sender_name, target, message).await;
            }
            Command::Who => {
                self.handle_who(&sender_name).await;
            }
            Command::Exit => {
                self.handle_exit(&sender_name).await;
            }
            // A stray invalid frame on the wire; the client filters these
            // locally, so produce no response at all.
            Command::Invalid => {
                debug!("ignoring invalid frame from {}", sender_name);
            }
        }
    }

    async fn handle_create_group(&mut self, sender_name: &str, group: String, members: Vec<String>) {
        let result = self.registry.create_group(sender_name, &group, &members);
        let feedback = match result {
            Ok(()) => {
                info!("{} created group \"{}\"", sender_name, group);
                FEEDBACK_SUCCEED
            }
            Err(_) => {
                info!("{} failed to create group \"{}\"", sender_name, group);
                FEEDBACK_FAILED
            }
        };
        self.send_to(sender_name, feedback.to_string()).await;
    }

    async fn handle_send(&mut self, sender_name: &str, target: String, message: String) {
        let relay = format!("{sender_name}: {message}");

        if self.registry.is_client(&target) {
            self.send_to(&target, relay).await;
            info!("{} sent a message to {}", sender_name, target);
            self.send_to(sender_name, FEEDBACK_SUCCEED.to_string()).await;
            return;
        }

        let Some(members) = self.registry.group_members(&target) else {
            info!("{} tried to send to unknown target {}", sender_name, target);
            self.send_to(sender_name, FEEDBACK_FAILED.to_string()).await;
            return;
        };

        if !members.iter().any(|m| m == sender_name) {
            info!("{} is not a member of group {}", sender_name, target);
            self.send_to(sender_name, FEEDBACK_FAILED.to_string()).await;
            return;
        }

        let recipients: Vec<String> = members
            .iter()
            .filter(|m| *m != sender_name)
            .cloned()
            .collect();
        for member in recipients {
            self.send_to(&member, relay.clone()).await;
        }
        info!("{} sent a message to group {}", sender_name, target);
        self.send_to(sender_name, FEEDBACK_SUCCEED.to_string()).await;
    }

    async fn handle_who(&mut self, sender_name: &str) {
        info!("{} requested the connected client list", sender_name);
        let line = self.registry.who_line();
        self.send_to(sender_name, line).await;
    }

    /// Unregister the sender, scrub it from every group, confirm, and let
    /// the connection close
    async fn handle_exit(&mut self, sender_name: &str) {
        let Some(entry) = self.registry.client(sender_name) else {
            return;
        };
        // Keep a handle for the feedback; unregister drops the stored one.
        let sender = entry.sender.clone();
        self.registry.unregister(sender_name);
        info!("{} unregistered", sender_name);
        debug!("total clients: {}", self.registry.client_count());

        let _ = sender.send(FEEDBACK_SUCCEED.to_string()).await;
        // The feedback handle drops here; with no senders left the write
        // task drains the queue and closes the socket.
    }

    /// Handle a connection that died without exiting
    fn handle_disconnect(&mut self, name: String) {
        if self.registry.is_client(&name) {
            warn!("{} disconnected without exiting", name);
            self.registry.unregister(&name);
            debug!("total clients: {}", self.registry.client_count());
        }
    }

    /// Queue a frame payload for a registered client, if still present
    async fn send_to(&self, name: &str, payload: String) {
        if let Some(client) = self.registry.client(name) {
            let _ = client.send(payload).await;
        }
    }
}

/// Channel buffer size for server commands
const CHANNEL_BUFFER_SIZE: usize = 256;

/// A bound chat server: listener plus a running ChatServer actor
///
/// Construction binds and listens; `run` accepts connections; sending
/// `ServerCommand::Shutdown` through [`Server::command_sender`] tears every
/// connection down.
pub struct Server {
    listener: TcpListener,
    cmd_tx: mpsc::Sender<ServerCommand>,
}

impl Server {
    /// Bind the listening socket and start the ChatServer actor
    pub async fn bind(addr: &str) -> Result<Self, AppError> {
        let listener = TcpListener::bind(addr).await.map_err(AppError::Connection)?;
        let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        tokio::spawn(ChatServer::new(cmd_rx).run());
        Ok(Self { listener, cmd_tx })
    }

    /// The address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        self.listener.local_addr().map_err(AppError::from)
    }

    /// A handle for injecting commands, e.g. `Shutdown` from the control
    /// input
    pub fn command_sender(&self) -> mpsc::Sender<ServerCommand> {
        self.cmd_tx.clone()
    }

    /// Accept connections until the task is dropped
    pub async fn run(self) -> Result<(), AppError> {
        info!("listening on {}", self.local_addr()?);
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("new connection from {}", addr);
                    let cmd_tx = self.cmd_tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = crate::handler::handle_connection(stream, cmd_tx).await {
                            error!("connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("failed to accept connection: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test harness: a running actor plus per-client outbound receivers
    struct Harness {
        cmd_tx: mpsc::Sender<ServerCommand>,
    }

    impl Harness {
        fn start() -> Self {
            let (cmd_tx, cmd_rx) = mpsc::channel(64);
            tokio::spawn(ChatServer::new(cmd_rx).run());
            Self { cmd_tx }
        }

        async fn register(&self, name: &str) -> Result<mpsc::Receiver<String>, AppError> {
            let (tx, rx) = mpsc::channel(16);
            let (ack_tx, ack_rx) = oneshot::channel();
            self.cmd_tx
                .send(ServerCommand::Register {
                    conn_id: ConnId::new(),
                    name: name.to_string(),
                    sender: tx,
                    ack: ack_tx,
                })
                .await
                .unwrap();
            ack_rx.await.unwrap().map(|()| rx)
        }

        async fn dispatch(&self, sender_name: &str, line: &str) {
            self.cmd_tx
                .send(ServerCommand::Dispatch {
                    sender_name: sender_name.to_string(),
                    command: crate::command::parse_command(line),
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_name() {
        let h = Harness::start();
        let _alice = h.register("alice").await.unwrap();
        assert!(matches!(
            h.register("alice").await,
            Err(AppError::DuplicateName)
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_group_name() {
        let h = Harness::start();
        let mut alice = h.register("alice").await.unwrap();
        let _bob = h.register("bob").await.unwrap();
        h.dispatch("alice", "create_group team bob").await;
        assert_eq!(alice.recv().await.unwrap(), FEEDBACK_SUCCEED);

        assert!(matches!(
            h.register("team").await,
            Err(AppError::DuplicateName)
        ));
    }

    #[tokio::test]
    async fn test_send_to_client_delivers_exactly_once() {
        let h = Harness::start();
        let mut alice = h.register("alice").await.unwrap();
        let mut bob = h.register("bob").await.unwrap();
        let mut carol = h.register("carol").await.unwrap();

        h.dispatch("alice", "send bob hello there").await;
        assert_eq!(bob.recv().await.unwrap(), "alice: hello there");
        assert_eq!(alice.recv().await.unwrap(), FEEDBACK_SUCCEED);

        // carol saw nothing; prove it by routing a later who past her queue
        h.dispatch("carol", "who").await;
        assert_eq!(carol.recv().await.unwrap(), "alice,bob,carol");
        assert!(bob.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_to_unknown_target_fails() {
        let h = Harness::start();
        let mut alice = h.register("alice").await.unwrap();
        h.dispatch("alice", "send ghost boo").await;
        assert_eq!(alice.recv().await.unwrap(), FEEDBACK_FAILED);
    }

    #[tokio::test]
    async fn test_group_send_reaches_other_members_only() {
        let h = Harness::start();
        let mut alice = h.register("alice").await.unwrap();
        let mut bob = h.register("bob").await.unwrap();
        let mut carol = h.register("carol").await.unwrap();
        let mut dave = h.register("dave").await.unwrap();

        h.dispatch("alice", "create_group team bob,carol").await;
        assert_eq!(alice.recv().await.unwrap(), FEEDBACK_SUCCEED);

        h.dispatch("alice", "send team hello").await;
        assert_eq!(bob.recv().await.unwrap(), "alice: hello");
        assert_eq!(carol.recv().await.unwrap(), "alice: hello");
        assert_eq!(alice.recv().await.unwrap(), FEEDBACK_SUCCEED);

        // non-member send fails with zero deliveries
        h.dispatch("dave", "send team intruding").await;
        assert_eq!(dave.recv().await.unwrap(), FEEDBACK_FAILED);
        h.dispatch("bob", "who").await;
        assert_eq!(bob.recv().await.unwrap(), "alice,bob,carol,dave");
        assert!(carol.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_who_sorted_and_empty() {
        let h = Harness::start();
        let mut carol = h.register("carol").await.unwrap();
        let _alice = h.register("alice").await.unwrap();
        let _bob = h.register("bob").await.unwrap();

        h.dispatch("carol", "who").await;
        assert_eq!(carol.recv().await.unwrap(), "alice,bob,carol");
    }

    #[tokio::test]
    async fn test_exit_scrubs_groups_and_who() {
        let h = Harness::start();
        let mut alice = h.register("alice").await.unwrap();
        let mut bob = h.register("bob").await.unwrap();
        let mut carol = h.register("carol").await.unwrap();

        h.dispatch("alice", "create_group team bob,carol").await;
        assert_eq!(alice.recv().await.unwrap(), FEEDBACK_SUCCEED);

        h.dispatch("carol", "exit").await;
        assert_eq!(carol.recv().await.unwrap(), FEEDBACK_SUCCEED);

        h.dispatch("alice", "who").await;
        assert_eq!(alice.recv().await.unwrap(), "alice,bob");

        // carol is out of the group: bob's group send reaches alice only
        h.dispatch("bob", "send team still here").await;
        assert_eq!(alice.recv().await.unwrap(), "bob: still here");
        assert_eq!(bob.recv().await.unwrap(), FEEDBACK_SUCCEED);
        assert!(carol.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_exit_frees_name_but_group_persists() {
        let h = Harness::start();
        let mut alice = h.register("alice").await.unwrap();
        let mut bob = h.register("bob").await.unwrap();
        h.dispatch("alice", "create_group team bob").await;
        assert_eq!(alice.recv().await.unwrap(), FEEDBACK_SUCCEED);

        h.dispatch("alice", "exit").await;
        assert_eq!(alice.recv().await.unwrap(), FEEDBACK_SUCCEED);
        h.dispatch("bob", "exit").await;
        assert_eq!(bob.recv().await.unwrap(), FEEDBACK_SUCCEED);

        // the emptied group still owns its name
        assert!(matches!(
            h.register("team").await,
            Err(AppError::DuplicateName)
        ));
        // but alice can reconnect under her old name
        let _alice2 = h.register("alice").await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_frame_gets_no_response() {
        let h = Harness::start();
        let mut alice = h.register("alice").await.unwrap();
        h.dispatch("alice", "gibberish input").await;
        h.dispatch("alice", "who").await;
        // the who feedback is the first thing alice ever receives
        assert_eq!(alice.recv().await.unwrap(), "alice");
    }
}
