//! Reconcile command - one-shot sync of a team's directory group

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::domain::{EmailAddress, Roster, TeamId};
use crate::infrastructure::retry::RetryPolicy;
use crate::infrastructure::team::SyncOutcome;

/// Arguments for the reconcile command
#[derive(Args, Clone)]
pub struct ReconcileArgs {
    /// Team identifier
    #[arg(long)]
    pub team: String,

    /// Address the group currently has, if one was ever created
    #[arg(long)]
    pub old: Option<String>,

    /// Address the group must have afterwards
    #[arg(long = "new")]
    pub new_address: String,

    /// Team member email (repeat for each member)
    #[arg(long = "member")]
    pub members: Vec<String>,

    /// Make a single attempt regardless of configured retries
    #[arg(long)]
    pub no_retry: bool,
}

impl ReconcileArgs {
    fn roster(&self) -> anyhow::Result<Roster> {
        let team_id = TeamId::new(&self.team).context("invalid --team")?;
        let new_address = EmailAddress::parse(&self.new_address).context("invalid --new")?;

        let members = self
            .members
            .iter()
            .map(|m| EmailAddress::parse(m).with_context(|| format!("invalid --member '{}'", m)))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut roster = Roster::new(team_id)
            .with_members(members)
            .with_desired_address(new_address);

        if let Some(old) = &self.old {
            let old = EmailAddress::parse(old).context("invalid --old")?;
            roster = roster.with_current_address(old);
        }

        Ok(roster)
    }
}

/// Run the reconcile command
pub async fn run(args: ReconcileArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let roster = args.roster()?;

    let policy = if args.no_retry {
        RetryPolicy::none()
    } else {
        RetryPolicy::from(&config.sync)
    };
    let service = crate::create_sync_service(&config, policy)?;

    match service.sync_roster(&roster).await {
        SyncOutcome::Synced(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        SyncOutcome::Skipped(reason) => {
            info!(team_id = %roster.team_id(), reason = ?reason, "Nothing to reconcile");
            Ok(())
        }
        SyncOutcome::Failed(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            anyhow::bail!(
                "directory sync for team '{}' failed after {} attempt(s)",
                record.team_id,
                record.attempts
            )
        }
    }
}
