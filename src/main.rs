use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use flags_game_server::config;
use flags_game_server::http::build_router;
use flags_game_server::logging;
use flags_game_server::server::GameServer;

#[derive(Parser, Debug)]
#[command(name = "flags-game-server", about = "Multiplayer flag-guessing game server")]
struct Cli {
    /// Load and validate configuration, then exit without starting the server.
    #[arg(long)]
    validate_config: bool,

    /// Print the fully-resolved configuration as JSON, then exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = config::load();

    if let Err(err) = config::validate_config_security(&config) {
        eprintln!("configuration failed validation: {err}");
        return ExitCode::FAILURE;
    }

    if cli.print_config {
        match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("failed to serialize configuration: {err}"),
        }
        return ExitCode::SUCCESS;
    }

    if cli.validate_config {
        println!("configuration is valid");
        return ExitCode::SUCCESS;
    }

    logging::init_with_config(&config.logging);

    let port = config.server.port;
    let server = Arc::new(GameServer::new(config));
    let shutdown_tx = server.spawn_background_tasks();

    let router = build_router(server).into_make_service_with_connect_info::<std::net::SocketAddr>();

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, %addr, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    info!(%addr, "flags-game-server listening");

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let _ = shutdown_tx.send(true);

    if let Err(err) = result {
        error!(error = %err, "server exited with error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
