// src/discord/commands/admin.rs
//
// The `/ckeylink` admin tree: configuration, toggles, and moderator lookups.

use log::error;
use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::model::prelude::*;
use serenity::prelude::*;
use std::sync::Arc;

use crate::discord::welcome;
use crate::gamedb::GameDatabase;
use crate::settings::{keys, SettingsStore};

use super::{config, lookup, respond, user_arg};

pub fn register() -> CreateCommand {
    let config_group = CreateCommandOption::new(
        CommandOptionType::SubCommandGroup,
        "config",
        "Configure the verification system",
    )
    .add_sub_option(CreateCommandOption::new(
        CommandOptionType::SubCommand,
        "current",
        "Show the current settings",
    ))
    .add_sub_option(
        CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "living-minutes",
            "Minimum living minutes before the living role is granted",
        )
        .add_sub_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "minutes",
                "Omit to remove the requirement",
            )
            .required(false),
        ),
    )
    .add_sub_option(
        CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "verified-role",
            "Role applied on any successful verification",
        )
        .add_sub_option(
            CreateCommandOption::new(CommandOptionType::Role, "role", "Omit to unset")
                .required(false),
        ),
    )
    .add_sub_option(
        CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "living-role",
            "Role applied once the living minutes threshold is met",
        )
        .add_sub_option(
            CreateCommandOption::new(CommandOptionType::Role, "role", "Omit to unset")
                .required(false),
        ),
    )
    .add_sub_option(
        CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "instructions-link",
            "Link to the token-generation instructions",
        )
        .add_sub_option(
            CreateCommandOption::new(CommandOptionType::String, "link", "The link")
                .required(true),
        ),
    )
    .add_sub_option(
        CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "welcome-channel",
            "Channel for welcome messages",
        )
        .add_sub_option(
            CreateCommandOption::new(CommandOptionType::Channel, "channel", "The channel")
                .required(true),
        ),
    )
    .add_sub_option(
        CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "welcome-greeting",
            "Greeting for new members ({member} and {guild} are substituted)",
        )
        .add_sub_option(
            CreateCommandOption::new(CommandOptionType::String, "text", "The greeting")
                .required(true),
        ),
    )
    .add_sub_option(
        CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "disabled-greeting",
            "Greeting used while verification is disabled",
        )
        .add_sub_option(
            CreateCommandOption::new(CommandOptionType::String, "text", "The greeting")
                .required(true),
        ),
    )
    .add_sub_option(
        CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "bunker-warning",
            "Warning appended to greetings while the bunker is up",
        )
        .add_sub_option(
            CreateCommandOption::new(CommandOptionType::String, "text", "The warning")
                .required(true),
        ),
    );

    CreateCommand::new("ckeylink")
        .description("Verification system administration")
        .default_member_permissions(Permissions::ADMINISTRATOR)
        .dm_permission(false)
        .add_option(config_group)
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "bunker",
            "Toggle the bunker warning on or off",
        ))
        .add_option(CreateCommandOption::new(
            CommandOptionType::SubCommand,
            "broken",
            "Toggle the whole verification system off, for when it breaks",
        ))
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "whois",
                "Show the ckey linked to a user",
            )
            .add_sub_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "The user")
                    .required(true),
            ),
        )
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "discords",
                "List every Discord account a ckey has verified with",
            )
            .add_sub_option(
                CreateCommandOption::new(CommandOptionType::String, "ckey", "The ckey")
                    .required(true),
            ),
        )
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "deverify",
                "Remove all verifications for a user's ckey",
            )
            .add_sub_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "The user")
                    .required(true),
            ),
        )
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "test",
                "Send the welcome message as if this user just joined",
            )
            .add_sub_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "The user")
                    .required(true),
            ),
        )
}

pub async fn run(
    ctx: Context,
    command: CommandInteraction,
    db: Arc<dyn GameDatabase>,
    settings: Arc<SettingsStore>,
) -> Result<(), serenity::Error> {
    let Some(guild_id) = command.guild_id else {
        return respond(&ctx, &command, "This command only works inside a server.").await;
    };

    let options = command.data.options();
    let Some(top) = options.into_iter().next() else {
        return respond(&ctx, &command, "Nothing to do.").await;
    };

    match (top.name, top.value) {
        ("config", ResolvedValue::SubCommandGroup(subs)) => {
            config::run(&ctx, &command, guild_id, &subs, settings.as_ref()).await
        }
        ("bunker", _) => {
            toggle(&ctx, &command, guild_id, settings.as_ref(), keys::BUNKER,
                   "Bunker warning is now ON.", "Bunker warning is now OFF.")
            .await
        }
        ("broken", _) => {
            toggle(&ctx, &command, guild_id, settings.as_ref(), keys::DISABLED,
                   "The verification system is now DISABLED.",
                   "The verification system is now ENABLED.")
            .await
        }
        ("whois", ResolvedValue::SubCommand(args)) => {
            lookup::whois(&ctx, &command, db.as_ref(), &args).await
        }
        ("discords", ResolvedValue::SubCommand(args)) => {
            lookup::discords(&ctx, &command, db.as_ref(), &args).await
        }
        ("deverify", ResolvedValue::SubCommand(args)) => {
            lookup::deverify(&ctx, &command, db.as_ref(), &args).await
        }
        ("test", ResolvedValue::SubCommand(args)) => {
            welcome_test(&ctx, &command, guild_id, settings.as_ref(), &args).await
        }
        _ => respond(&ctx, &command, "Command not implemented").await,
    }
}

async fn toggle(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    settings: &SettingsStore,
    key: &str,
    on: &str,
    off: &str,
) -> Result<(), serenity::Error> {
    match settings.toggle(guild_id.get(), key) {
        Ok(true) => respond(ctx, command, on).await,
        Ok(false) => respond(ctx, command, off).await,
        Err(e) => {
            error!("could not toggle {key} for guild {guild_id}: {e}");
            respond(ctx, command, "There was a problem flipping that setting.").await
        }
    }
}

async fn welcome_test(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    settings: &SettingsStore,
    args: &[ResolvedOption<'_>],
) -> Result<(), serenity::Error> {
    let Some(user) = user_arg(args, "user") else {
        return respond(ctx, command, "Pick a user to greet.").await;
    };
    let member = match guild_id.member(&ctx.http, user.id).await {
        Ok(member) => member,
        Err(e) => {
            error!("could not fetch member {} in guild {guild_id}: {e}", user.id);
            return respond(ctx, command, "Could not find that member in this server.").await;
        }
    };
    welcome::handle_member_join(ctx, settings, &member).await;
    respond(ctx, command, "Welcome flow triggered.").await
}
