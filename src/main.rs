mod budget;
mod catalog;
mod cli;
mod db;
mod error;
mod fmt;
mod goal;
mod investment;
mod ledger;
mod models;
mod period;
mod reports;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, Context};

/// `RUST_LOG` wins, then `--verbose`, then the configured level.
fn setup_logging(verbose: bool, configured: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_new(configured).unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let settings = match settings::load_settings() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    setup_logging(cli.verbose, &settings.log_level);
    fmt::set_currency(&settings.default_currency);

    let ctx = Context {
        settings,
        db_override: cli.db,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(&ctx, data_dir),
        Commands::Status => cli::status::run(&ctx),
        Commands::Transactions { command } => cli::transactions::dispatch(&ctx, command),
        Commands::Categories { command } => cli::categories::dispatch(&ctx, command),
        Commands::Accounts { command } => cli::accounts::dispatch(&ctx, command),
        Commands::Budgets { command } => cli::budgets::dispatch(&ctx, command),
        Commands::Investments { command } => cli::investments::dispatch(&ctx, command),
        Commands::Goals { command } => cli::goals::dispatch(&ctx, command),
        Commands::Reports { command } => cli::reports::dispatch(&ctx, command),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
