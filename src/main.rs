// src/main.rs
// CLI surface and process entrypoint (spec §6 "CLI surface").

use clap::{Parser, Subcommand};
use gitnexus_mcp::config::DEFAULT_PORT;
use gitnexus_mcp::{lifecycle, logging, CONFIG};

#[derive(Parser, Debug)]
#[command(name = "gitnexus-mcp")]
#[command(version)]
#[command(about = "MCP gateway bridging an AI agent to the GitNexus browser code-intelligence engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the gateway daemon and connect it to the agent over stdio.
    Serve {
        /// Localhost port the bridge binds to or joins.
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let _ = dotenvy::dotenv();
    logging::init(&CONFIG.log_level);

    let cli = Cli::parse();
    let Command::Serve { port } = cli.command;

    match lifecycle::run(port).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "gitnexus-mcp exited with an error");
            std::process::ExitCode::FAILURE
        }
    }
}
