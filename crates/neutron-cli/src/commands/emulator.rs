use neutron_core::local_state::LocalStateStore;
use neutron_core::PlatformId;
use serde::Serialize;

use crate::cli::EmulatorCommands;
use crate::commands::common::{existing_path, CliContext};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct EmulatorItem {
    platform_id: PlatformId,
    emulator_path: String,
}

pub fn run_emulator(command: EmulatorCommands, context: &CliContext) -> Result<(), CliError> {
    match command {
        EmulatorCommands::List { json } => {
            let items = context
                .state
                .load_emulators()?
                .iter()
                .map(|(platform_id, path)| EmulatorItem {
                    platform_id,
                    emulator_path: path.display().to_string(),
                })
                .collect::<Vec<_>>();

            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("No emulators configured.");
            } else {
                for item in &items {
                    println!("{:>6}  {}", item.platform_id, item.emulator_path);
                }
            }
            Ok(())
        }
        EmulatorCommands::Set { platform, path } => {
            let emulator_path = existing_path(&path)?;
            let mut emulators = context.state.load_emulators()?;
            emulators.set(platform, &emulator_path);
            context.state.save_emulators(&emulators)?;
            println!("Platform {platform} -> {}", emulator_path.display());
            Ok(())
        }
        EmulatorCommands::Remove { platform } => {
            let mut emulators = context.state.load_emulators()?;
            if emulators.remove(platform).is_some() {
                context.state.save_emulators(&emulators)?;
                println!("Removed emulator for platform {platform}");
            } else {
                println!("No emulator configured for platform {platform}");
            }
            Ok(())
        }
    }
}
