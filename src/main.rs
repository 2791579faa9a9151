use clap::Parser;
use roster_sync::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Reconcile(args) => cli::reconcile::run(args).await,
        Command::RemoveGroup(args) => cli::groups::remove(args).await,
        Command::Groups => cli::groups::list().await,
        Command::Members(args) => cli::groups::members(args).await,
    }
}
