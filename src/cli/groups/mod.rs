//! Group commands - inspect and remove directory groups

use anyhow::Context;
use clap::Args;

use crate::domain::{DirectoryClient, EmailAddress, TeamId};
use crate::infrastructure::retry::RetryPolicy;

/// Arguments for the remove-group command
#[derive(Args, Clone)]
pub struct RemoveGroupArgs {
    /// Team the group belongs to
    #[arg(long)]
    pub team: String,

    /// Group address to delete
    #[arg(long)]
    pub address: String,
}

/// Arguments for the members command
#[derive(Args, Clone)]
pub struct MembersArgs {
    /// Group address
    #[arg(long)]
    pub address: String,
}

/// Delete a team's group; a missing group is not an error
pub async fn remove(args: RemoveGroupArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let team_id = TeamId::new(&args.team).context("invalid --team")?;
    let address = EmailAddress::parse(&args.address).context("invalid --address")?;

    let service = crate::create_sync_service(&config, RetryPolicy::from(&config.sync))?;

    if !service.remove_team_group(&team_id, &address).await {
        anyhow::bail!("failed to remove group '{}'", address);
    }

    Ok(())
}

/// Print every group address, one per line
pub async fn list() -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let client = crate::create_directory_client(&config)?;

    for group in client.list_groups().await? {
        println!("{}", group);
    }

    Ok(())
}

/// Print a group's members, one per line
pub async fn members(args: MembersArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let address = EmailAddress::parse(&args.address).context("invalid --address")?;
    let client = crate::create_directory_client(&config)?;

    for member in client.list_members(&address).await? {
        println!("{}", member);
    }

    Ok(())
}
