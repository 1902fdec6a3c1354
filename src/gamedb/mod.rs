mod client;
mod models;

pub use client::SqliteGameDb;
pub use models::{Ckey, DiscordLink, Player};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("one-time token has already been claimed")]
    TokenSpent,
}

/// Contract against the game-side database. The verification resolver only
/// ever talks to this trait, so tests run against a fake and the bot runs
/// against [`SqliteGameDb`].
#[async_trait]
pub trait GameDatabase: Send + Sync {
    /// Resolves an unclaimed one-time token to the ckey it was generated for.
    async fn lookup_ckey_by_token(&self, token: &str) -> Result<Option<Ckey>, DbError>;

    /// The single valid link for a Discord account, if one exists.
    async fn find_valid_link_by_account(&self, account_id: u64) -> Result<Option<DiscordLink>, DbError>;

    /// Full link history for a ckey, newest first. Unclaimed token rows are
    /// not part of the history.
    async fn links_for_ckey(&self, ckey: &Ckey) -> Result<Vec<DiscordLink>, DbError>;

    async fn invalidate_links_for_ckey(&self, ckey: &Ckey) -> Result<(), DbError>;

    async fn invalidate_links_for_account(&self, account_id: u64) -> Result<(), DbError>;

    /// Claims the token row for the given account and marks it valid.
    /// Fails with [`DbError::TokenSpent`] if another account got there first.
    async fn create_link(&self, token: &str, account_id: u64) -> Result<(), DbError>;

    async fn get_player_by_ckey(&self, ckey: &Ckey) -> Result<Option<Player>, DbError>;

    /// The full relink sequence: drop every valid link touching the ckey or
    /// the account, then claim the token. Implementations that can make the
    /// sequence atomic against concurrent relinks should override this.
    async fn rewrite_link(&self, token: &str, ckey: &Ckey, account_id: u64) -> Result<(), DbError> {
        self.invalidate_links_for_ckey(ckey).await?;
        self.invalidate_links_for_account(account_id).await?;
        self.create_link(token, account_id).await
    }
}
