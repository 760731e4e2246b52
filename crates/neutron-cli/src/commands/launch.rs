use neutron_core::launch::{LaunchResult, SessionReport, Supervisor};
use neutron_core::{GameId, PlatformId};
use serde::Serialize;

use crate::commands::common::{format_session_report, CliContext};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct LaunchOutput<'a> {
    launch: &'a LaunchResult,
    session: Option<&'a SessionReport>,
}

/// Launch one game and block until its session, including the post-exit sync, is done.
pub async fn run_launch(
    game_id: GameId,
    platform_id: PlatformId,
    as_json: bool,
    context: &CliContext,
) -> Result<(), CliError> {
    let engine = context.sync_engine()?;
    let supervisor = Supervisor::new(context.state.clone(), engine);

    let result = supervisor.launch(game_id, platform_id).await;
    if !result.success {
        if as_json {
            print_json(&result, None)?;
        }
        return Err(CliError::LaunchFailed(result.message));
    }
    if !as_json {
        println!("{}", result.message);
    }

    let report = supervisor.wait(game_id).await;
    if as_json {
        return print_json(&result, report.as_ref());
    }
    match report {
        Some(report) => {
            for line in format_session_report(&report) {
                println!("{line}");
            }
        }
        None => println!("Session ended without a report"),
    }
    Ok(())
}

fn print_json(launch: &LaunchResult, session: Option<&SessionReport>) -> Result<(), CliError> {
    let output = LaunchOutput { launch, session };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
