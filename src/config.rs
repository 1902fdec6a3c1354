use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::logging::LogLevel;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub discord_token: Option<String>,
    /// Home guild for instant command registration. Leave unset to register
    /// the commands globally (they take up to an hour to propagate).
    pub discord_guild_id: Option<String>,
    /// Database the game server writes tokens and player records into.
    pub game_database_path: Option<String>,
    /// The bot's own database, holding per-guild settings.
    pub bot_database_path: Option<String>,
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Config {
    const CONFIG_PATH: &'static str = "ckeylink.conf";
    const DEFAULT_GAME_DB: &'static str = "game.db";
    const DEFAULT_BOT_DB: &'static str = "ckeylink.db";

    pub fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if Path::new(Self::CONFIG_PATH).exists() {
            let mut config: Config = toml::from_str(&fs::read_to_string(Self::CONFIG_PATH)?)?;
            config.prompt_for_missing_fields()?;
            Ok(config)
        } else {
            Self::initial_setup()
        }
    }

    pub fn game_database_path(&self) -> String {
        self.game_database_path
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_GAME_DB.to_string())
    }

    pub fn bot_database_path(&self) -> String {
        self.bot_database_path
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_BOT_DB.to_string())
    }

    fn prompt_for_missing_fields(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.discord_token.is_none() {
            self.discord_token = Some(Self::prompt_input("Enter your Discord Bot Token: ")?);
        }
        if self.game_database_path.is_none() {
            self.game_database_path = Some(Self::prompt_path(
                "Enter the path to the game database",
                Self::DEFAULT_GAME_DB,
            )?);
        }
        if self.bot_database_path.is_none() {
            self.bot_database_path = Some(Self::prompt_path(
                "Enter the path for the bot's own database",
                Self::DEFAULT_BOT_DB,
            )?);
        }

        self.save()?;
        Ok(())
    }

    fn initial_setup() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        println!("Welcome to ckeylink! Let's set up your configuration.");
        println!("You'll need a Discord bot application first:");
        println!("1. Go to https://discord.com/developers/applications");
        println!("2. Create an application, then add a bot under the 'Bot' tab");
        println!("3. Enable the 'Server Members Intent' (needed for welcome messages)");
        println!("4. Reset and copy the bot token");
        println!("5. Invite the bot with the 'bot' and 'applications.commands' scopes");
        println!("   and the Manage Roles permission");
        println!("\nPress Enter when you're ready to continue...");
        let mut buffer = String::new();
        io::stdin().read_line(&mut buffer)?;

        let discord_token = Self::prompt_input("Enter your Discord Bot Token: ")?;
        let discord_guild_id = Self::prompt_input(
            "Enter your server's Guild ID for instant command registration (leave empty to register globally): ",
        )?;
        let game_database_path =
            Self::prompt_path("Enter the path to the game database", Self::DEFAULT_GAME_DB)?;
        let bot_database_path = Self::prompt_path(
            "Enter the path for the bot's own database",
            Self::DEFAULT_BOT_DB,
        )?;

        let config = Config {
            discord_token: Some(discord_token),
            discord_guild_id: if discord_guild_id.is_empty() {
                None
            } else {
                Some(discord_guild_id)
            },
            game_database_path: Some(game_database_path),
            bot_database_path: Some(bot_database_path),
            log_level: LogLevel::default(),
        };

        config.save()?;
        println!("Configuration saved to {}", Self::CONFIG_PATH);
        Ok(config)
    }

    fn prompt_input(prompt: &str) -> Result<String, io::Error> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    fn prompt_path(prompt: &str, default: &str) -> Result<String, io::Error> {
        let input = Self::prompt_input(&format!("{prompt} (default: {default}): "))?;
        Ok(if input.is_empty() {
            default.to_string()
        } else {
            input
        })
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        fs::write(Self::CONFIG_PATH, toml::to_string(self)?)?;
        Ok(())
    }
}
