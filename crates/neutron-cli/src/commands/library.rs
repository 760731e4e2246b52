use std::path::{Path, PathBuf};

use neutron_core::local_state::{sanitize_filename, LocalStateStore};
use neutron_core::GameId;
use serde::Serialize;

use crate::cli::LibraryCommands;
use crate::commands::common::{existing_file, existing_path, CliContext};
use crate::error::CliError;

const ROMS_DIR_NAME: &str = "roms";

#[derive(Debug, Serialize)]
pub struct LibraryItem {
    pub game_id: GameId,
    pub rom_path: String,
    pub installed: bool,
}

pub fn run_library(command: LibraryCommands, context: &CliContext) -> Result<(), CliError> {
    match command {
        LibraryCommands::List { json } => run_library_list(json, context),
        LibraryCommands::Set { game, rom } => {
            let rom_path = set_install(context, game, &rom)?;
            println!("Game {game} -> {}", rom_path.display());
            Ok(())
        }
        LibraryCommands::Import {
            game,
            title,
            source,
        } => {
            let rom_path = import_rom(context, game, &title, &source)?;
            println!("Imported game {game} -> {}", rom_path.display());
            Ok(())
        }
        LibraryCommands::Remove { game } => {
            let mut library = context.state.load_library()?;
            if library.remove(game).is_some() {
                context.state.save_library(&library)?;
                println!("Removed game {game} from the library");
            } else {
                println!("Game {game} is not installed");
            }
            Ok(())
        }
    }
}

fn run_library_list(as_json: bool, context: &CliContext) -> Result<(), CliError> {
    let items = library_items(context)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if items.is_empty() {
        println!("No games installed.");
        return Ok(());
    }
    for item in &items {
        let marker = if item.installed { "" } else { " (missing)" };
        println!("{:>6}  {}{marker}", item.game_id, item.rom_path);
    }
    Ok(())
}

pub fn library_items(context: &CliContext) -> Result<Vec<LibraryItem>, CliError> {
    Ok(context
        .state
        .load_library()?
        .iter()
        .map(|(game_id, rom_path)| LibraryItem {
            game_id,
            installed: rom_path.exists(),
            rom_path: rom_path.display().to_string(),
        })
        .collect())
}

pub fn set_install(context: &CliContext, game_id: GameId, rom: &Path) -> Result<PathBuf, CliError> {
    let rom_path = existing_path(rom)?;
    let mut library = context.state.load_library()?;
    library.set(game_id, &rom_path);
    context.state.save_library(&library)?;
    tracing::info!(game_id = %game_id, rom_path = %rom_path.display(), "Recorded install");
    Ok(rom_path)
}

/// Copy `source` to `<data dir>/roms/<title>.<ext>` and record it as the install.
pub fn import_rom(
    context: &CliContext,
    game_id: GameId,
    title: &str,
    source: &Path,
) -> Result<PathBuf, CliError> {
    let source = existing_file(source)?;
    let file_stem = sanitize_filename(title);
    if file_stem.is_empty() {
        return Err(CliError::EmptyTitle);
    }

    let file_name = match source.extension() {
        Some(extension) => format!("{file_stem}.{}", extension.to_string_lossy()),
        None => file_stem,
    };
    let roms_dir = context.data_dir.join(ROMS_DIR_NAME);
    std::fs::create_dir_all(&roms_dir)?;
    let target = roms_dir.join(&file_name);
    // Copy beside the target first; `source` may be the target itself on re-import
    let partial = roms_dir.join(format!("{file_name}.part"));
    if let Err(error) = std::fs::copy(&source, &partial)
        .and_then(|_| std::fs::rename(&partial, &target))
    {
        std::fs::remove_file(&partial).ok();
        return Err(error.into());
    }

    set_install(context, game_id, &target)
}
