use crate::cli::SyncCommands;
use crate::commands::common::{describe_pull, describe_push, CliContext};
use crate::error::CliError;

pub async fn run_sync(command: SyncCommands, context: &CliContext) -> Result<(), CliError> {
    let engine = context.sync_engine()?;
    match command {
        SyncCommands::Pull { game } => {
            let save_path = context.save_path(game)?;
            let outcome = engine.pull_if_newer(game, &save_path).await;
            println!("{}", describe_pull(&outcome));
        }
        SyncCommands::Push { game } => {
            let save_path = context.save_path(game)?;
            let outcome = engine.push_new_version(game, &save_path).await;
            println!("{}", describe_push(&outcome));
        }
    }
    Ok(())
}
