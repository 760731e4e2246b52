use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use neutron_core::{GameId, PlatformId};

#[derive(Parser)]
#[command(name = "neutron")]
#[command(about = "Launch emulated games with cloud save sync and playtime tracking")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding settings and local state (defaults to the platform data dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull the latest save, run the emulator, then push the save and report playtime
    Launch {
        /// Catalog id of the game
        #[arg(long, value_name = "ID")]
        game: GameId,
        /// Catalog id of the platform whose emulator should run the game
        #[arg(long, value_name = "ID")]
        platform: PlatformId,
        /// Print the launch result and session report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage installed games
    Library {
        #[command(subcommand)]
        command: LibraryCommands,
    },
    /// Manage emulator executables per platform
    Emulator {
        #[command(subcommand)]
        command: EmulatorCommands,
    },
    /// Run one save sync step outside a play session
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Show or change client settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage the stored bearer token
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

#[derive(Subcommand)]
pub enum LibraryCommands {
    /// List installed games
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record an existing ROM file as the install of a game
    Set {
        #[arg(long, value_name = "ID")]
        game: GameId,
        /// Path to the ROM file
        #[arg(value_name = "ROM")]
        rom: PathBuf,
    },
    /// Copy a ROM into the data directory under a sanitized title and record it
    Import {
        #[arg(long, value_name = "ID")]
        game: GameId,
        /// Game title used as the file name
        #[arg(long)]
        title: String,
        /// ROM file to copy
        #[arg(value_name = "ROM")]
        source: PathBuf,
    },
    /// Forget the install of a game (the ROM file is left in place)
    Remove {
        #[arg(long, value_name = "ID")]
        game: GameId,
    },
}

#[derive(Subcommand)]
pub enum EmulatorCommands {
    /// List configured emulators
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the emulator executable for a platform
    Set {
        #[arg(long, value_name = "ID")]
        platform: PlatformId,
        /// Path to the emulator executable
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Remove the emulator of a platform
    Remove {
        #[arg(long, value_name = "ID")]
        platform: PlatformId,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Download the server's latest save when it is newer than the local one
    Pull {
        #[arg(long, value_name = "ID")]
        game: GameId,
    },
    /// Upload the local save as a new server version
    Push {
        #[arg(long, value_name = "ID")]
        game: GameId,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Store the save server base URL
    SetApiUrl {
        /// Base URL, e.g. <http://127.0.0.1:8000>
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Store the fullscreen preference
    Fullscreen {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store a bearer token issued by the account service
    SetToken {
        /// Access token
        #[arg(value_name = "TOKEN")]
        token: String,
    },
    /// Show whether a bearer token is stored
    Status,
    /// Remove the stored bearer token
    Logout,
}
