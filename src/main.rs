use anyhow::Result;
use clap::Parser;

use todoboard::commands::{self, Commands};
use todoboard::config::ConnectionArgs;
use todoboard::logging;

#[derive(Parser, Debug)]
#[command(
    name = "todoboard",
    version,
    about = "Kanban to-do board backed by a headless content store"
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Debug logging (RUST_LOG still wins)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Board);

    // The board owns the terminal; keep logs out of it.
    let _guard = match command {
        Commands::Board => Some(logging::init_file(cli.debug)?),
        _ => {
            logging::init_stderr(cli.debug)?;
            None
        }
    };

    commands::run(command, &cli.connection).await
}
