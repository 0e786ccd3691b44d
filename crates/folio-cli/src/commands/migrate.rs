//! Registry migration commands.

use clap::{Args, Subcommand};

use crate::output;
use folio_core::error::AppError;
use folio_database::DatabasePool;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
    /// Check that the registry database answers
    Check,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config_path: &str) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    if config.storage.registry != "postgres" {
        output::print_warning(&format!(
            "Registry backend is '{}'; nothing to migrate.",
            config.storage.registry
        ));
        return Ok(());
    }
    let pool = DatabasePool::connect(&config.database).await?;

    match &args.command {
        MigrateCommand::Run => {
            println!("Running registry migrations...");
            pool.migrate().await?;
            output::print_success("All migrations applied successfully.");
        }
        MigrateCommand::Check => {
            if pool.health_check().await? {
                output::print_success("Registry database is reachable.");
            } else {
                output::print_warning("Registry database returned an unexpected answer.");
            }
        }
    }

    pool.close().await;
    Ok(())
}
