pub mod config;
pub mod discord;
pub mod gamedb;
pub mod logging;
pub mod settings;
pub mod verification;

use log::{error, info};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::discord::DiscordClient;
use crate::gamedb::{GameDatabase, SqliteGameDb};
use crate::settings::SettingsStore;
use crate::verification::AttemptLimits;

pub struct BotClients {
    pub discord: DiscordClient,
}

pub async fn init(
    config: Arc<RwLock<Config>>,
) -> Result<BotClients, Box<dyn std::error::Error + Send + Sync>> {
    let (game_db_path, bot_db_path) = {
        let config_read = config.read().await;
        (
            config_read.game_database_path(),
            config_read.bot_database_path(),
        )
    };

    let db: Arc<dyn GameDatabase> = Arc::new(SqliteGameDb::open(&game_db_path)?);
    info!("opened game database at {game_db_path}");

    let settings = Arc::new(SettingsStore::open(&bot_db_path)?);
    info!("opened settings database at {bot_db_path}");

    let limits = Arc::new(AttemptLimits::new());

    let discord = DiscordClient::new(config, db, settings, limits).await?;

    Ok(BotClients { discord })
}

pub async fn run(
    clients: BotClients,
    _config: Arc<RwLock<Config>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let discord = Arc::new(clients.discord);

    let starter = Arc::clone(&discord);
    let discord_handle = tokio::spawn(async move {
        if let Err(e) = starter.start().await {
            error!("Discord client error: {e:?}");
        }
    });
    let handles = vec![discord_handle];

    info!("Bot is now running. Press Ctrl+C to exit.");

    tokio::select! {
        _ = futures::future::join_all(handles) => {
            info!("All handlers have completed.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down.");
            discord.shutdown().await?;
        }
    }

    info!("Bot has shut down.");
    Ok(())
}
