//! CLI module for roster-sync
//!
//! Operator commands against the configured directory service:
//! - `reconcile`: converge a team's group with a roster
//! - `remove-group`: delete a disbanded team's group
//! - `groups` / `members`: inspect the directory

pub mod groups;
pub mod reconcile;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// roster-sync - keep team mailing lists in line with team rosters
#[derive(Parser)]
#[command(name = "roster-sync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile a team's directory group with its roster
    Reconcile(reconcile::ReconcileArgs),

    /// Delete a team's directory group
    RemoveGroup(groups::RemoveGroupArgs),

    /// List every group in the directory
    Groups,

    /// List the members of one group
    Members(groups::MembersArgs),
}

/// Load `.env` and configuration, then start logging
fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    Ok(config)
}
