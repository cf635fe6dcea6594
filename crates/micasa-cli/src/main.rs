//! MiCasa CLI
//!
//! Command-line interface for the MiCasa user store. Every invocation opens
//! the database and brings its schema up to date before running the command.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use micasa_core::logging_facility::{self, Profile};
use micasa_core_types::CancellationToken;
use micasa_store::{apply_migrations, default_catalog, Store, StoreConfig};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "micasa")]
#[command(about = "MiCasa - user store administration", long_about = None)]
struct Cli {
    /// Database file (created if missing)
    #[arg(long, global = true, env = "MICASA_DB", default_value = "micasa.db")]
    db: PathBuf,

    /// Logging profile: dev or prod
    #[arg(long, global = true, env = "MICASA_LOG_PROFILE", default_value = "prod")]
    log_profile: Profile,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Schema migrations
    Migrate(commands::migrate::MigrateArgs),
    /// User administration
    User(commands::user::UserArgs),
}

fn main() {
    let cli = Cli::parse();
    logging_facility::init(cli.log_profile);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();

    // Startup failures here are fatal
    let store = Store::open(&StoreConfig::file(&cli.db))?;
    let report = apply_migrations(&store, &default_catalog(), &cancel)?;

    match cli.command {
        Commands::Migrate(args) => commands::migrate::execute(args, &store, &report, &cancel),
        Commands::User(args) => commands::user::execute(args, store, &cancel),
    }
}
