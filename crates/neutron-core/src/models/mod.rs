//! Data models for Neutron

mod game;
mod playtime;
mod save_version;

pub use game::{GameId, PlatformId};
pub use playtime::{is_reportable_session, PlaytimeRecord, MIN_REPORTABLE_SESSION_SECS};
pub use save_version::{SaveVersion, SaveVersionInfo};
