//! Connection handler
//!
//! Owns one client socket: performs registration, then pumps frames in both
//! directions. Inbound frames are parsed and forwarded to the ChatServer
//! actor; outbound payloads arrive on an mpsc channel and are written as
//! frames, in order. An I/O failure here tears down this connection only.

use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::command::parse_command;
use crate::error::AppError;
use crate::frame::{read_frame, write_frame};
use crate::name::is_valid_name;
use crate::server::{ServerCommand, FEEDBACK_FAILED, FEEDBACK_SUCCEED};
use crate::types::ConnId;

/// Outbound queue depth per connection
const OUTBOUND_BUFFER_SIZE: usize = 32;

/// Handle a new TCP connection
///
/// Reads the identity frame, registers with the ChatServer, and on success
/// runs the frame pump until the client exits or the connection dies. A
/// rejected registration gets a `Failed` frame and a closed socket.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let conn_id = ConnId::new();
    debug!("connection {} from {}", conn_id, peer_addr);

    let (mut reader, mut writer) = stream.into_split();

    // The identity frame comes before anything else.
    let name = read_frame(&mut reader).await?;

    // The client validates its own name before connecting; an arbitrary
    // socket may not have, and the registries must never hold an invalid name.
    if !is_valid_name(&name) {
        warn!("connection {} sent invalid identity {:?}", conn_id, name);
        write_frame(&mut writer, FEEDBACK_FAILED).await?;
        return Ok(());
    }

    let (msg_tx, mut msg_rx) = mpsc::channel::<String>(OUTBOUND_BUFFER_SIZE);
    let (ack_tx, ack_rx) = oneshot::channel();
    cmd_tx
        .send(ServerCommand::Register {
            conn_id,
            name: name.clone(),
            sender: msg_tx,
            ack: ack_tx,
        })
        .await
        .map_err(|_| AppError::ChannelSend)?;

    match ack_rx.await {
        Ok(Ok(())) => {
            write_frame(&mut writer, FEEDBACK_SUCCEED).await?;
        }
        Ok(Err(_)) => {
            // Rejected: report and close rather than leaving the socket
            // dangling with no further protocol defined.
            write_frame(&mut writer, FEEDBACK_FAILED).await?;
            return Ok(());
        }
        Err(_) => return Err(AppError::ChannelSend),
    }

    // Read task: frames off the socket into dispatcher commands.
    let cmd_tx_read = cmd_tx.clone();
    let read_name = name.clone();
    let read_task = tokio::spawn(async move {
        loop {
            let payload = match read_frame(&mut reader).await {
                Ok(payload) => payload,
                Err(AppError::ConnectionClosed) => {
                    debug!("{} closed the connection", read_name);
                    break;
                }
                Err(e) => {
                    warn!("read error for {}: {}", read_name, e);
                    break;
                }
            };
            let command = parse_command(&payload);
            if cmd_tx_read
                .send(ServerCommand::Dispatch {
                    sender_name: read_name.clone(),
                    command,
                })
                .await
                .is_err()
            {
                debug!("server closed, ending read task for {}", read_name);
                break;
            }
        }
    });

    // Write task: queued payloads onto the socket as frames. Ends when the
    // registry drops this client's sender (exit or shutdown) or on a write
    // failure.
    let write_name = name.clone();
    let write_task = tokio::spawn(async move {
        while let Some(payload) = msg_rx.recv().await {
            if let Err(e) = write_frame(&mut writer, &payload).await {
                warn!("write error for {}: {}", write_name, e);
                break;
            }
        }
        debug!("write task ended for {}", write_name);
        // Dropping the writer closes our side of the socket.
    });

    tokio::select! {
        _ = read_task => {
            debug!("read task completed for {}", name);
        }
        _ = write_task => {
            debug!("write task completed for {}", name);
        }
    }

    // No-op if the client already unregistered via Exit.
    let _ = cmd_tx.send(ServerCommand::Disconnect { name: name.clone() }).await;

    info!("connection for {} finished", name);
    Ok(())
}
