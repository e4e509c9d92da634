// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use keyhole_client::{AuthClient, FileSessionStore};

mod cli;
mod commands;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    logging::init()?;

    let args = Cli::parse();

    if let Commands::Version = &args.command {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let session_file = match &args.session_file {
        Some(path) => path.clone(),
        None => FileSessionStore::default_path()?,
    };
    log::debug!("session file: {}", session_file.display());
    let client = AuthClient::new(&args.server, Arc::new(FileSessionStore::new(session_file)))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match &args.command {
            Commands::Register(register) => commands::register(&client, register).await,
            Commands::Login(login) => commands::login(&client, login).await,
            Commands::Profile => commands::profile(&client).await,
            Commands::Logout => commands::logout(&client).await,
            Commands::Status => commands::status(&client).await,
            Commands::Version => Ok(()),
        }
    })
}
