use log::{debug, error, info};
use serenity::async_trait;
use serenity::builder::{CreateInteractionResponse, CreateInteractionResponseMessage};
use serenity::model::application::Command;
use serenity::model::prelude::*;
use serenity::prelude::*;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::discord::commands::{admin, verify};
use crate::discord::welcome;
use crate::gamedb::GameDatabase;
use crate::settings::SettingsStore;
use crate::verification::AttemptLimits;

pub struct EventHandler {
    config: Arc<RwLock<Config>>,
    db: Arc<dyn GameDatabase>,
    settings: Arc<SettingsStore>,
    limits: Arc<AttemptLimits>,
}

impl EventHandler {
    pub fn new(
        config: Arc<RwLock<Config>>,
        db: Arc<dyn GameDatabase>,
        settings: Arc<SettingsStore>,
        limits: Arc<AttemptLimits>,
    ) -> Self {
        Self {
            config,
            db,
            settings,
            limits,
        }
    }
}

#[async_trait]
impl serenity::client::EventHandler for EventHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        let commands = vec![verify::register(), admin::register()];

        // A configured home guild gets guild-scoped registration (instant,
        // handy while setting up); otherwise the commands go global.
        let guild_id = {
            let config_read = self.config.read().await;
            config_read
                .discord_guild_id
                .clone()
                .and_then(|id| id.parse::<u64>().ok())
        };

        let registered = match guild_id {
            Some(guild_id) => {
                GuildId::new(guild_id)
                    .set_commands(&ctx.http, commands)
                    .await
            }
            None => Command::set_global_commands(&ctx.http, commands).await,
        };

        match registered {
            Ok(commands) => debug!(
                "slash commands registered: {:?}",
                commands.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
            ),
            Err(why) => error!("could not register slash commands: {why}"),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            debug!("received command interaction: {}", command.data.name);

            let result = match command.data.name.as_str() {
                "verify" => {
                    verify::run(
                        ctx,
                        command,
                        self.db.clone(),
                        self.settings.clone(),
                        self.limits.clone(),
                    )
                    .await
                }
                "ckeylink" => {
                    admin::run(ctx, command, self.db.clone(), self.settings.clone()).await
                }
                _ => {
                    command
                        .create_response(
                            &ctx.http,
                            CreateInteractionResponse::Message(
                                CreateInteractionResponseMessage::new()
                                    .content("Command not implemented"),
                            ),
                        )
                        .await
                }
            };

            if let Err(why) = result {
                error!("cannot respond to slash command: {why}");
            }
        }
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        welcome::handle_member_join(&ctx, self.settings.as_ref(), &new_member).await;
    }
}
