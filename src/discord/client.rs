// src/discord/client.rs

use log::{info, warn};
use serenity::gateway::ShardManager;
use serenity::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;
use crate::gamedb::GameDatabase;
use crate::settings::SettingsStore;
use crate::verification::AttemptLimits;

use super::events::EventHandler;

pub struct DiscordClient {
    client: Arc<Mutex<Option<Client>>>,
    // Kept outside the client mutex so shutdown works while start() runs.
    shard_manager: Arc<ShardManager>,
}

impl DiscordClient {
    pub async fn new(
        config: Arc<RwLock<Config>>,
        db: Arc<dyn GameDatabase>,
        settings: Arc<SettingsStore>,
        limits: Arc<AttemptLimits>,
    ) -> Result<Self, serenity::Error> {
        let token = {
            let config_read = config.read().await;
            config_read.discord_token.clone().ok_or(serenity::Error::Other(
                "Discord token not found in configuration",
            ))?
        };

        // GUILD_MEMBERS is a privileged intent; it has to be enabled on the
        // application for member-join greetings to arrive.
        let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS;

        let client = Client::builder(&token, intents)
            .event_handler(EventHandler::new(config.clone(), db, settings, limits))
            .await?;
        let shard_manager = client.shard_manager.clone();

        Ok(Self {
            client: Arc::new(Mutex::new(Some(client))),
            shard_manager,
        })
    }

    pub async fn shutdown(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Shutting down DiscordClient...");
        match tokio::time::timeout(Duration::from_secs(10), self.shard_manager.shutdown_all())
            .await
        {
            Ok(_) => info!("Discord shards shut down successfully"),
            Err(_) => warn!("Timed out while shutting down Discord shards"),
        }
        info!("DiscordClient shutdown complete.");
        Ok(())
    }

    pub async fn start(&self) -> Result<(), serenity::Error> {
        let mut client_guard = self.client.lock().await;
        if let Some(client) = client_guard.as_mut() {
            client.start().await
        } else {
            Err(serenity::Error::Other("Discord client has already been started"))
        }
    }
}
