// Handlers for the `config` subcommand group of the admin command.

use log::error;
use serenity::builder::{
    CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
};
use serenity::model::prelude::*;
use serenity::prelude::*;

use crate::settings::{keys, SettingsStore};

use super::{channel_arg, int_arg, respond, role_arg, str_arg};

// Settings shown by `config current`; anything else is displayed redacted,
// same as the original whitelist.
const VISIBLE_CONFIG: &[&str] = &[
    keys::MIN_LIVING_MINUTES,
    keys::VERIFIED_ROLE,
    keys::INSTRUCTIONS_LINK,
    keys::WELCOME_GREETING,
    keys::DISABLED_GREETING,
    keys::BUNKER_WARNING,
    keys::BUNKER,
    keys::WELCOME_CHANNEL,
];

pub(super) async fn run(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    subs: &[ResolvedOption<'_>],
    settings: &SettingsStore,
) -> Result<(), serenity::Error> {
    let Some(sub) = subs.first() else {
        return respond(ctx, command, "Nothing to configure.").await;
    };
    let args: &[ResolvedOption<'_>] = match &sub.value {
        ResolvedValue::SubCommand(args) => args.as_slice(),
        _ => &[],
    };

    match sub.name {
        "current" => current(ctx, command, guild_id, settings).await,
        "living-minutes" => living_minutes(ctx, command, guild_id, settings, args).await,
        "verified-role" => {
            set_role(ctx, command, guild_id, settings, keys::VERIFIED_ROLE, args).await
        }
        "living-role" => {
            set_role(ctx, command, guild_id, settings, keys::VERIFIED_LIVING_ROLE, args).await
        }
        "instructions-link" => {
            let link = str_arg(args, "link").unwrap_or_default();
            set_text(
                ctx, command, guild_id, settings,
                keys::INSTRUCTIONS_LINK, link,
                &format!("Instructions link set to: `{link}`"),
            )
            .await
        }
        "welcome-greeting" => {
            let text = str_arg(args, "text").unwrap_or_default();
            set_text(
                ctx, command, guild_id, settings,
                keys::WELCOME_GREETING, text,
                &format!("Welcome greeting set to: `{text}`"),
            )
            .await
        }
        "disabled-greeting" => {
            let text = str_arg(args, "text").unwrap_or_default();
            set_text(
                ctx, command, guild_id, settings,
                keys::DISABLED_GREETING, text,
                &format!("Disabled greeting set to: `{text}`"),
            )
            .await
        }
        "bunker-warning" => {
            let text = str_arg(args, "text").unwrap_or_default();
            set_text(
                ctx, command, guild_id, settings,
                keys::BUNKER_WARNING, text,
                &format!("Bunker warning set to: `{text}`"),
            )
            .await
        }
        "welcome-channel" => welcome_channel(ctx, command, guild_id, settings, args).await,
        _ => respond(ctx, command, "Unknown config subcommand.").await,
    }
}

async fn current(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    settings: &SettingsStore,
) -> Result<(), serenity::Error> {
    let snapshot = match settings.guild(guild_id.get()) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("could not load settings for guild {guild_id}: {e}");
            return respond(ctx, command, "There was a problem reading the settings.").await;
        }
    };

    let none = || "None".to_string();
    let display = [
        (keys::MIN_LIVING_MINUTES, snapshot.min_living_minutes.to_string()),
        (
            keys::VERIFIED_ROLE,
            snapshot.verified_role.map(|id| format!("<@&{id}>")).unwrap_or_else(none),
        ),
        (
            keys::VERIFIED_LIVING_ROLE,
            snapshot.verified_living_role.map(|id| format!("<@&{id}>")).unwrap_or_else(none),
        ),
        (keys::INSTRUCTIONS_LINK, snapshot.instructions_link),
        (keys::WELCOME_GREETING, snapshot.welcome_greeting),
        (keys::DISABLED_GREETING, snapshot.disabled_greeting),
        (keys::BUNKER_WARNING, snapshot.bunker_warning),
        (keys::BUNKER, snapshot.bunker.to_string()),
        (keys::DISABLED, snapshot.disabled.to_string()),
        (
            keys::WELCOME_CHANNEL,
            snapshot.welcome_channel.map(|id| format!("<#{id}>")).unwrap_or_else(none),
        ),
    ];

    let mut embed = CreateEmbed::new().title("__Current settings:__");
    for (key, value) in display {
        let shown = if !VISIBLE_CONFIG.contains(&key) {
            "`redacted`".to_string()
        } else if value.is_empty() {
            none()
        } else {
            value
        };
        embed = embed.field(format!("{key}:"), shown, false);
    }

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().embed(embed),
            ),
        )
        .await
}

async fn living_minutes(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    settings: &SettingsStore,
    args: &[ResolvedOption<'_>],
) -> Result<(), serenity::Error> {
    // No argument clears the threshold, so verification qualifies everyone.
    let (minutes, confirmation) = match int_arg(args, "minutes") {
        Some(minutes) => (
            minutes,
            format!("Minimum living minutes required for verification set to: `{minutes}`"),
        ),
        None => (
            0,
            "Minimum living minutes requirement has been removed.".to_string(),
        ),
    };

    if minutes < 0 {
        return respond(ctx, command, "The minimum cannot be negative.").await;
    }
    if let Err(e) = settings.set(guild_id.get(), keys::MIN_LIVING_MINUTES, &minutes.to_string()) {
        error!("could not store {} for guild {guild_id}: {e}", keys::MIN_LIVING_MINUTES);
        return respond(ctx, command, "There was a problem setting the minimum living minutes.")
            .await;
    }
    respond(ctx, command, &confirmation).await
}

async fn set_role(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    settings: &SettingsStore,
    key: &str,
    args: &[ResolvedOption<'_>],
) -> Result<(), serenity::Error> {
    // The role option type guarantees an existing role of this guild, so no
    // further validation is needed. Omitting it unsets the role.
    match role_arg(args, "role") {
        Some(role) => {
            if let Err(e) = settings.set(guild_id.get(), key, &role.id.get().to_string()) {
                error!("could not store {key} for guild {guild_id}: {e}");
                return respond(ctx, command, "There was a problem setting the role.").await;
            }
            respond(
                ctx,
                command,
                &format!("When a user passes this verification step, the `{}` role will be applied.", role.name),
            )
            .await
        }
        None => {
            if let Err(e) = settings.unset(guild_id.get(), key) {
                error!("could not clear {key} for guild {guild_id}: {e}");
                return respond(ctx, command, "There was a problem clearing the role.").await;
            }
            respond(ctx, command, "No role will be applied for this verification step.").await
        }
    }
}

async fn set_text(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    settings: &SettingsStore,
    key: &str,
    value: &str,
    confirmation: &str,
) -> Result<(), serenity::Error> {
    if let Err(e) = settings.set(guild_id.get(), key, value) {
        error!("could not store {key} for guild {guild_id}: {e}");
        return respond(ctx, command, "There was a problem saving that setting.").await;
    }
    respond(ctx, command, confirmation).await
}

async fn welcome_channel(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    settings: &SettingsStore,
    args: &[ResolvedOption<'_>],
) -> Result<(), serenity::Error> {
    let Some(channel) = channel_arg(args, "channel") else {
        return respond(ctx, command, "Pick a channel for the welcome messages.").await;
    };

    // Posting the confirmation into the chosen channel doubles as the
    // send-permission probe.
    if channel
        .id
        .say(&ctx.http, "I will now post welcome messages in this channel.")
        .await
        .is_err()
    {
        return respond(
            ctx,
            command,
            &format!("I don't have permission to send messages in <#{}>.", channel.id),
        )
        .await;
    }

    if let Err(e) = settings.set(
        guild_id.get(),
        keys::WELCOME_CHANNEL,
        &channel.id.get().to_string(),
    ) {
        error!("could not store {} for guild {guild_id}: {e}", keys::WELCOME_CHANNEL);
        return respond(ctx, command, "There was a problem saving the welcome channel.").await;
    }
    respond(
        ctx,
        command,
        &format!("Welcome messages will now go to <#{}>.", channel.id),
    )
    .await
}
