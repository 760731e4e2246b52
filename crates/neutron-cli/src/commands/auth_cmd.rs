use neutron_core::local_state::{AuthState, LocalStateStore};

use crate::cli::AuthCommands;
use crate::commands::common::CliContext;
use crate::error::CliError;

pub fn run_auth(command: AuthCommands, context: &CliContext) -> Result<(), CliError> {
    match command {
        AuthCommands::SetToken { token } => {
            store_token(context, &token)?;
            println!("Bearer token stored in {}", context.state.auth_path().display());
        }
        AuthCommands::Status => {
            if context.state.load_auth()?.bearer_token().is_some() {
                println!("Signed in: bearer token stored");
            } else {
                println!("Not signed in: save sync works, playtime will not be reported");
            }
        }
        AuthCommands::Logout => {
            context.state.save_auth(&AuthState::default())?;
            println!("Signed out");
        }
    }
    Ok(())
}

pub fn store_token(context: &CliContext, token: &str) -> Result<(), CliError> {
    let auth = AuthState::with_token(token);
    if auth.bearer_token().is_none() {
        return Err(CliError::EmptyToken);
    }
    context.state.save_auth(&auth)?;
    Ok(())
}
