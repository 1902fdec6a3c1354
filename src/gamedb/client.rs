use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::models::{Ckey, DiscordLink, Player};
use super::{DbError, GameDatabase};

/// Sqlite-backed implementation of the game database contract.
///
/// The game server side inserts token and player rows; the bot reads them
/// and claims tokens. All access goes through one connection behind a mutex,
/// so the relink transaction is serialised against every other writer.
pub struct SqliteGameDb {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGameDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(&path)?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS discord_links (
                id INTEGER PRIMARY KEY,
                ckey TEXT NOT NULL,
                discord_id INTEGER,
                one_time_token TEXT NOT NULL UNIQUE,
                timestamp INTEGER NOT NULL,
                valid INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS players (
                ckey TEXT PRIMARY KEY,
                living_minutes INTEGER NOT NULL DEFAULT 0,
                first_seen INTEGER,
                last_seen INTEGER
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_discord_links_ckey ON discord_links (ckey)",
            [],
        )?;

        info!("game database schema created or updated");

        Ok(SqliteGameDb {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Ingestion point for the game side: records a freshly generated
    /// one-time token for a ckey. The row becomes a link once claimed.
    pub fn insert_one_time_token(&self, ckey: &Ckey, token: &str) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO discord_links (ckey, one_time_token, timestamp, valid) VALUES (?1, ?2, ?3, 0)",
        )?;
        stmt.execute(params![ckey.as_str(), token, Utc::now().timestamp()])?;
        Ok(())
    }

    /// Ingestion point for the game side: creates or refreshes a player row.
    pub fn upsert_player(&self, ckey: &Ckey, living_minutes: i64) -> Result<(), DbError> {
        let now = Utc::now().timestamp();
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO players (ckey, living_minutes, first_seen, last_seen) VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(ckey) DO UPDATE SET living_minutes = ?2, last_seen = ?3",
        )?;
        stmt.execute(params![ckey.as_str(), living_minutes, now])?;
        Ok(())
    }
}

fn link_from_row(row: &rusqlite::Row) -> rusqlite::Result<DiscordLink> {
    Ok(DiscordLink {
        ckey: Ckey::normalise(&row.get::<_, String>(0)?),
        discord_id: row.get::<_, Option<i64>>(1)?.map(|id| id as u64),
        timestamp: DateTime::from_timestamp(row.get::<_, i64>(2)?, 0).unwrap_or_else(Utc::now),
        valid: row.get::<_, i64>(3)? != 0,
    })
}

#[async_trait]
impl GameDatabase for SqliteGameDb {
    async fn lookup_ckey_by_token(&self, token: &str) -> Result<Option<Ckey>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT ckey FROM discord_links WHERE one_time_token = ?1 AND discord_id IS NULL",
        )?;
        let ckey = stmt
            .query_row([token], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(ckey.map(|c| Ckey::normalise(&c)))
    }

    async fn find_valid_link_by_account(&self, account_id: u64) -> Result<Option<DiscordLink>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT ckey, discord_id, timestamp, valid FROM discord_links
             WHERE discord_id = ?1 AND valid = 1
             ORDER BY timestamp DESC, id DESC LIMIT 1",
        )?;
        let link = stmt
            .query_row([account_id as i64], link_from_row)
            .optional()?;
        Ok(link)
    }

    async fn links_for_ckey(&self, ckey: &Ckey) -> Result<Vec<DiscordLink>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT ckey, discord_id, timestamp, valid FROM discord_links
             WHERE ckey = ?1 AND discord_id IS NOT NULL
             ORDER BY timestamp DESC, id DESC",
        )?;
        let links = stmt
            .query_map([ckey.as_str()], link_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    async fn invalidate_links_for_ckey(&self, ckey: &Ckey) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "UPDATE discord_links SET valid = 0 WHERE ckey = ?1 AND valid = 1",
        )?;
        stmt.execute([ckey.as_str()])?;
        Ok(())
    }

    async fn invalidate_links_for_account(&self, account_id: u64) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "UPDATE discord_links SET valid = 0 WHERE discord_id = ?1 AND valid = 1",
        )?;
        stmt.execute([account_id as i64])?;
        Ok(())
    }

    async fn create_link(&self, token: &str, account_id: u64) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "UPDATE discord_links SET discord_id = ?2, valid = 1, timestamp = ?3
             WHERE one_time_token = ?1 AND discord_id IS NULL",
        )?;
        let claimed = stmt.execute(params![token, account_id as i64, Utc::now().timestamp()])?;
        if claimed == 0 {
            return Err(DbError::TokenSpent);
        }
        Ok(())
    }

    async fn get_player_by_ckey(&self, ckey: &Ckey) -> Result<Option<Player>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT living_minutes, first_seen, last_seen FROM players WHERE ckey = ?1",
        )?;
        let player = stmt
            .query_row([ckey.as_str()], |row| {
                Ok(Player {
                    ckey: ckey.clone(),
                    living_minutes: row.get(0)?,
                    first_seen: row
                        .get::<_, Option<i64>>(1)?
                        .and_then(|ts| DateTime::from_timestamp(ts, 0)),
                    last_seen: row
                        .get::<_, Option<i64>>(2)?
                        .and_then(|ts| DateTime::from_timestamp(ts, 0)),
                })
            })
            .optional()?;
        Ok(player)
    }

    // One transaction instead of three statements, so a concurrent relink
    // against the same ckey or account can never observe the intermediate
    // state where the old links are gone but the new one does not exist yet.
    async fn rewrite_link(&self, token: &str, ckey: &Ckey, account_id: u64) -> Result<(), DbError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE discord_links SET valid = 0 WHERE ckey = ?1 AND valid = 1",
            [ckey.as_str()],
        )?;
        tx.execute(
            "UPDATE discord_links SET valid = 0 WHERE discord_id = ?1 AND valid = 1",
            [account_id as i64],
        )?;
        let claimed = tx.execute(
            "UPDATE discord_links SET discord_id = ?2, valid = 1, timestamp = ?3
             WHERE one_time_token = ?1 AND discord_id IS NULL",
            params![token, account_id as i64, Utc::now().timestamp()],
        )?;
        if claimed == 0 {
            return Err(DbError::TokenSpent);
        }
        tx.commit()?;
        Ok(())
    }
}
