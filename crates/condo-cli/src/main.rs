//! # condo CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use condo_cli::account::{run_login, run_statement, LoginArgs, StatementArgs};
use condo_cli::dashboard::{run_dashboard, run_refresh, DashboardArgs};
use condo_cli::password::{run_hash_password, HashPasswordArgs};

/// Condominium ledger client.
///
/// Hashes passwords for the users sheet, logs in against the backend and
/// prints account statements and the delinquency dashboard.
#[derive(Parser, Debug)]
#[command(name = "condo", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read a password from stdin and print its bcrypt hash.
    HashPassword(HashPasswordArgs),

    /// Log in and print a bearer token.
    Login(LoginArgs),

    /// Print an account statement.
    Statement(StatementArgs),

    /// Print the delinquency dashboard (ADMIN).
    Dashboard(DashboardArgs),

    /// Recompute delinquency, then print the dashboard (ADMIN).
    Refresh(DashboardArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::HashPassword(args) => run_hash_password(args),
        Commands::Login(args) => run_login(args).await,
        Commands::Statement(args) => run_statement(args).await,
        Commands::Dashboard(args) => run_dashboard(args).await,
        Commands::Refresh(args) => run_refresh(args).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
