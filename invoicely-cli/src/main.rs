use clap::Parser;
use invoicely::{AddContext, SqliteStore, Workspace};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

mod cli;
mod commands;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), invoicely::Error> {
    init_tracing();
    let cli = Cli::parse();
    let store = SqliteStore::open(&cli.db).add_context("opening database from cli")?;
    let mut ws = Workspace::open(store).add_context("loading workspace from cli")?;

    match cli.command {
        Command::Client(command) => commands::client(&mut ws, command),
        Command::Invoice(command) => {
            commands::invoice(&mut ws, command, &cli.uploads, &cli.webdriver).await
        }
        Command::Settings(command) => commands::settings(&mut ws, command),
        Command::Logo { path } => commands::logo(&mut ws, &path, &cli.uploads),
        Command::Dashboard => {
            commands::dashboard(&ws);
            Ok(())
        }
        Command::Reset { confirm } => commands::reset(&mut ws, &confirm),
    }
}
