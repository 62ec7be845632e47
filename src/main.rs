use anyhow::Result;
use clap::{Parser, Subcommand};
use roomchat::config::{ClientConfig, ServerConfig};
use roomchat::disconnect::DisconnectClient;
use roomchat::dispatch::{self, Dispatcher};
use roomchat::form::LoginForm;
use roomchat::view::TerminalView;
use roomchat::{channel, server, ChatController};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "roomchat")]
#[command(about = "Real-time chat rooms over WebSocket")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the room relay server
    Serve(ServerConfig),

    /// Join a room from this terminal
    Join(ClientConfig),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,roomchat=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Commands::Serve(config) => {
            info!("[Main] Starting chat server...");
            server::run_server(&config).await?;
        }
        Commands::Join(config) => join(config).await?,
    }
    Ok(())
}

async fn join(config: ClientConfig) -> Result<()> {
    let (channel, inbound) = channel::connect(&config.server).await?;
    let controller = ChatController::new(
        channel,
        TerminalView::new(std::io::stdout()),
        DisconnectClient::new(&config.http),
    )
    .with_notification_ttl(config.notification_ttl());
    let form = LoginForm::new(config.username.clone(), config.room.clone());
    let input = dispatch::spawn_terminal_input();

    if let Some(pending) = Dispatcher::new(controller, form, inbound, input).run().await {
        if tokio::time::timeout(config.unload_grace(), pending).await.is_err() {
            warn!("[Main] Disconnect notification still pending; exiting anyway.");
        }
    }
    info!("[Main] Bye.");
    Ok(())
}
