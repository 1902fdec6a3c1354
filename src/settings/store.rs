use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::models::{keys, GuildSettings};

/// Per-guild key/value configuration, persisted in the bot's own database.
pub struct SettingsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SettingsStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(&path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS guild_settings (
                guild_id INTEGER NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (guild_id, key)
            )",
            [],
        )?;

        info!("settings database schema created or updated");

        Ok(SettingsStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn get(&self, guild_id: u64, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT value FROM guild_settings WHERE guild_id = ?1 AND key = ?2",
        )?;
        stmt.query_row(params![guild_id as i64, key], |row| row.get(0))
            .optional()
    }

    pub fn set(&self, guild_id: u64, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "INSERT OR REPLACE INTO guild_settings (guild_id, key, value) VALUES (?1, ?2, ?3)",
        )?;
        stmt.execute(params![guild_id as i64, key, value])?;
        Ok(())
    }

    /// Removes a key so the snapshot falls back to its default.
    pub fn unset(&self, guild_id: u64, key: &str) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "DELETE FROM guild_settings WHERE guild_id = ?1 AND key = ?2",
        )?;
        stmt.execute(params![guild_id as i64, key])?;
        Ok(())
    }

    /// Flips a boolean setting and returns the new state.
    pub fn toggle(&self, guild_id: u64, key: &str) -> Result<bool, rusqlite::Error> {
        let current = self
            .get(guild_id, key)?
            .map(|v| v == "true")
            .unwrap_or(false);
        let flipped = !current;
        self.set(guild_id, key, if flipped { "true" } else { "false" })?;
        Ok(flipped)
    }

    /// A point-in-time snapshot of everything configured for a guild,
    /// with defaults filled in for anything unset.
    pub fn guild(&self, guild_id: u64) -> Result<GuildSettings, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT key, value FROM guild_settings WHERE guild_id = ?1",
        )?;
        let rows = stmt
            .query_map([guild_id as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut settings = GuildSettings::default();
        for (key, value) in rows {
            match key.as_str() {
                keys::MIN_LIVING_MINUTES => {
                    if let Ok(minutes) = value.parse() {
                        settings.min_living_minutes = minutes;
                    }
                }
                keys::VERIFIED_ROLE => settings.verified_role = value.parse().ok(),
                keys::VERIFIED_LIVING_ROLE => settings.verified_living_role = value.parse().ok(),
                keys::INSTRUCTIONS_LINK => settings.instructions_link = value,
                keys::WELCOME_GREETING => settings.welcome_greeting = value,
                keys::DISABLED_GREETING => settings.disabled_greeting = value,
                keys::BUNKER_WARNING => settings.bunker_warning = value,
                keys::BUNKER => settings.bunker = value == "true",
                keys::DISABLED => settings.disabled = value == "true",
                keys::WELCOME_CHANNEL => settings.welcome_channel = value.parse().ok(),
                _ => {}
            }
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> SettingsStore {
        SettingsStore::open(":memory:").unwrap()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let store = open_store();
        let settings = store.guild(1).unwrap();
        assert_eq!(settings, GuildSettings::default());
        assert_eq!(settings.min_living_minutes, 60);
    }

    #[test]
    fn set_and_snapshot_round_trip() {
        let store = open_store();
        store.set(1, keys::MIN_LIVING_MINUTES, "120").unwrap();
        store.set(1, keys::VERIFIED_ROLE, "111").unwrap();
        store.set(1, keys::WELCOME_GREETING, "Welcome {member} to {guild}!").unwrap();
        store.set(1, keys::WELCOME_CHANNEL, "999").unwrap();

        let settings = store.guild(1).unwrap();
        assert_eq!(settings.min_living_minutes, 120);
        assert_eq!(settings.verified_role, Some(111));
        assert_eq!(settings.welcome_greeting, "Welcome {member} to {guild}!");
        assert_eq!(settings.welcome_channel, Some(999));

        // Another guild is untouched.
        assert_eq!(store.guild(2).unwrap(), GuildSettings::default());
    }

    #[test]
    fn unset_restores_the_default() {
        let store = open_store();
        store.set(1, keys::VERIFIED_ROLE, "111").unwrap();
        store.unset(1, keys::VERIFIED_ROLE).unwrap();
        assert_eq!(store.guild(1).unwrap().verified_role, None);
    }

    #[test]
    fn toggle_flips_from_the_default() {
        let store = open_store();
        assert!(store.toggle(1, keys::BUNKER).unwrap());
        assert!(store.guild(1).unwrap().bunker);
        assert!(!store.toggle(1, keys::BUNKER).unwrap());
        assert!(!store.guild(1).unwrap().bunker);
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let store = open_store();
        store.set(1, keys::MIN_LIVING_MINUTES, "not-a-number").unwrap();
        store.set(1, keys::VERIFIED_ROLE, "also garbage").unwrap();
        let settings = store.guild(1).unwrap();
        assert_eq!(settings.min_living_minutes, 60);
        assert_eq!(settings.verified_role, None);
    }
}
