use neutron_core::config::ClientSettings;
use neutron_core::local_state::LocalStateStore;

use crate::cli::{ConfigCommands, Toggle};
use crate::commands::common::CliContext;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, context: &mut CliContext) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => {
            for line in config_lines(context)? {
                println!("{line}");
            }
            Ok(())
        }
        ConfigCommands::SetApiUrl { url } => {
            context.settings.set_api_base_url(&url)?;
            let path = context.settings.save_to_dir(&context.data_dir)?;
            println!(
                "API base URL set to {} ({})",
                context.settings.api_base_url.as_deref().unwrap_or_default(),
                path.display()
            );
            Ok(())
        }
        ConfigCommands::Fullscreen { state } => {
            set_fullscreen(context, state)?;
            println!(
                "Fullscreen {}",
                if state.is_on() { "enabled" } else { "disabled" }
            );
            Ok(())
        }
    }
}

pub fn set_fullscreen(context: &CliContext, state: Toggle) -> Result<(), CliError> {
    let mut emulators = context.state.load_emulators()?;
    emulators.fullscreen = state.is_on();
    context.state.save_emulators(&emulators)?;
    Ok(())
}

pub fn config_lines(context: &CliContext) -> Result<Vec<String>, CliError> {
    let emulators = context.state.load_emulators()?;
    let auth = context.state.load_auth()?;
    Ok(vec![
        format!("data_dir: {}", context.data_dir.display()),
        format!(
            "settings: {}",
            ClientSettings::path_in(&context.data_dir).display()
        ),
        format!("api_base_url: {}", context.settings.resolve_api_base_url()?),
        format!("fullscreen: {}", emulators.fullscreen),
        format!(
            "bearer_token: {}",
            if auth.bearer_token().is_some() {
                "stored"
            } else {
                "none"
            }
        ),
    ])
}
