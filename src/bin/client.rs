//! framechat client entry point
//!
//! `framechat-client <name> <host> <port>`: validates the name locally,
//! connects and registers, then hands over to the interactive session loop.

use std::env;
use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

use framechat::{is_valid_name, render, AppError, Session};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("framechat=warn")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::Usage(_)) => {
            render::client_usage();
            ExitCode::FAILURE
        }
        Err(AppError::Connection(e)) => {
            error!("could not connect: {}", e);
            render::failed_connection();
            ExitCode::FAILURE
        }
        Err(AppError::DuplicateName) => {
            render::duplicate_name();
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let args: Vec<String> = env::args().skip(1).collect();
    let [name, host, port] = args.as_slice() else {
        return Err(AppError::Usage("expected <name> <host> <port>".to_string()));
    };
    if !is_valid_name(name) {
        return Err(AppError::Usage("invalid client name".to_string()));
    }
    let _: u16 = port
        .parse()
        .map_err(|_| AppError::Usage("invalid port".to_string()))?;

    let session = Session::connect(name.clone(), &format!("{host}:{port}")).await?;
    render::connected();
    session.run().await
}
