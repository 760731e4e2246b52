//! Catalog identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Catalog identifier of a game.
///
/// The catalog service owns games; the sync core only uses the identifier to
/// key local install records, server save versions and playtime records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(i64);

/// Catalog identifier of a platform (console family an emulator runs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformId(i64);

impl GameId {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Key used for this game in the local library map.
    #[must_use]
    pub fn as_key(self) -> String {
        self.0.to_string()
    }
}

impl PlatformId {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Key used for this platform in the emulator config map.
    #[must_use]
    pub fn as_key(self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GameId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl FromStr for PlatformId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<i64> for GameId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<i64> for PlatformId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_from_library_keys() {
        assert_eq!("7".parse::<GameId>().unwrap(), GameId::new(7));
        assert_eq!(" 1 ".parse::<PlatformId>().unwrap(), PlatformId::new(1));
        assert!("mario".parse::<GameId>().is_err());
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        assert_eq!(serde_json::to_string(&GameId::new(42)).unwrap(), "42");
        assert_eq!(GameId::new(42).as_key(), "42");
    }
}
