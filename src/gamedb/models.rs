use chrono::{DateTime, Utc};
use std::fmt;

/// Canonical in-game player identifier: lowercased, alphanumerics only.
/// Anything a moderator types (BYOND keys with spaces, dashes, mixed case)
/// is normalised before it ever reaches a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ckey(String);

impl Ckey {
    pub fn normalise(raw: &str) -> Self {
        Ckey(
            raw.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .map(|c| c.to_ascii_lowercase())
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Ckey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of link history between a ckey and a Discord account.
/// `discord_id` is None while the row is still an unclaimed one-time token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordLink {
    pub ckey: Ckey,
    pub discord_id: Option<u64>,
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
}

/// Player record as the game server maintains it, keyed by ckey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub ckey: Ckey,
    pub living_minutes: i64,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalise_strips_everything_but_alphanumerics() {
        assert_eq!(Ckey::normalise("Oranges Are Good").as_str(), "orangesaregood");
        assert_eq!(Ckey::normalise("some_guy-42").as_str(), "someguy42");
        assert_eq!(Ckey::normalise("ALLCAPS").as_str(), "allcaps");
    }

    #[test]
    fn normalise_can_produce_an_empty_ckey() {
        assert!(Ckey::normalise("___ ---").is_empty());
    }
}
