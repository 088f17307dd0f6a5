//! framechat server entry point
//!
//! Binds the listening socket, starts the ChatServer actor, and watches its
//! own stdin for the `EXIT` control line. Everything runs on one thread.

use std::env;
use std::process::ExitCode;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::error;
use tracing_subscriber::EnvFilter;

use framechat::{render, AppError, Server, ServerCommand};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=framechat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("framechat=info")),
        )
        .init();

    match run().await {
        Ok(()) => {
            render::server_shutdown();
            ExitCode::SUCCESS
        }
        Err(AppError::Usage(_)) => {
            render::server_usage();
            ExitCode::FAILURE
        }
        Err(AppError::Connection(e)) => {
            error!("failed to set up the server: {}", e);
            render::failed_connection();
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let port: u16 = env::args()
        .nth(1)
        .ok_or_else(|| AppError::Usage("missing port".to_string()))?
        .parse()
        .map_err(|_| AppError::Usage("invalid port".to_string()))?;

    let server = Server::bind(&format!("0.0.0.0:{port}")).await?;
    let cmd_tx = server.command_sender();

    tokio::select! {
        result = server.run() => result,
        result = watch_control_input(cmd_tx) => result,
    }
}

/// Watch the server's own stdin: `EXIT` shuts the whole service down, any
/// other line is reported invalid and ignored
async fn watch_control_input(cmd_tx: mpsc::Sender<ServerCommand>) -> Result<(), AppError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line == "EXIT" {
            cmd_tx
                .send(ServerCommand::Shutdown)
                .await
                .map_err(|_| AppError::ChannelSend)?;
            return Ok(());
        }
        render::invalid_input();
    }
    // Control input closed; keep serving clients indefinitely.
    std::future::pending().await
}
