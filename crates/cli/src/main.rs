//! Lumen CLI: the main entry point.
//!
//! Commands:
//! - `onboard`  Write a default config file
//! - `serve`    Start the HTTP gateway
//! - `chat`     Interactive chat or single-message mode
//! - `clear`    Erase the saved conversation

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "lumen",
    about = "Lumen: research-grounded conversational assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and data directories
    Onboard,

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the assistant through a running gateway
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Override the gateway URL
        #[arg(long)]
        server: Option<String>,
    },

    /// Erase the saved conversation
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat { message, server } => commands::chat::run(message, server).await?,
        Commands::Clear => commands::clear::run().await?,
    }

    Ok(())
}
