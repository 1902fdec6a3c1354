// src/discord/commands/verify.rs

use log::{error, info, warn};
use serenity::builder::{
    CreateCommand, CreateCommandOption, CreateInteractionResponse,
    CreateInteractionResponseMessage, EditInteractionResponse,
};
use serenity::model::prelude::*;
use serenity::prelude::*;
use std::sync::Arc;

use crate::discord::roles;
use crate::gamedb::GameDatabase;
use crate::settings::SettingsStore;
use crate::verification::{
    self, AttemptLimits, LimitExceeded, ResolutionResult, ResolveRequest, VerifyError,
};

use super::respond_ephemeral;

const GENERIC_RETRY: &str = "A system error occurred. Please try again.";

pub fn register() -> CreateCommand {
    CreateCommand::new("verify")
        .description("Link your in-game ckey to your Discord account")
        .dm_permission(false)
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "token",
                "One-time token generated in game",
            )
            .required(false),
        )
}

pub async fn run(
    ctx: Context,
    command: CommandInteraction,
    db: Arc<dyn GameDatabase>,
    settings: Arc<SettingsStore>,
    limits: Arc<AttemptLimits>,
) -> Result<(), serenity::Error> {
    let Some(guild_id) = command.guild_id else {
        return respond_ephemeral(&ctx, &command, "Verification only works inside a server.").await;
    };

    // All responses are ephemeral: the token is a secret, and nobody else
    // in the channel needs to see the outcome either.
    let _guard = match limits.try_begin(command.user.id.get(), guild_id.get()) {
        Ok(guard) => guard,
        Err(LimitExceeded::Cooldown { retry_after }) => {
            warn!(
                "verification rate limit hit by {} (discord id {})",
                command.user.name, command.user.id
            );
            let wait = retry_after.as_secs().max(1);
            return respond_ephemeral(
                &ctx,
                &command,
                &format!("Slow down there — try again in {wait} seconds."),
            )
            .await;
        }
        Err(LimitExceeded::TooManyInFlight) => {
            error!(
                "too many concurrent verifications in guild {guild_id}, is the database wedged?"
            );
            return respond_ephemeral(
                &ctx,
                &command,
                "Too many verifications are running right now, try again in 30 seconds.",
            )
            .await;
        }
    };

    let token = command
        .data
        .options()
        .into_iter()
        .find_map(|opt| match opt.value {
            ResolvedValue::String(value) if opt.name == "token" => {
                Some(value.trim().to_string())
            }
            _ => None,
        })
        .filter(|token| !token.is_empty());

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(
                CreateInteractionResponseMessage::new().ephemeral(true),
            ),
        )
        .await?;

    let guild_settings = match settings.guild(guild_id.get()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("could not load settings for guild {guild_id}: {e}");
            return edit(&ctx, &command, GENERIC_RETRY).await;
        }
    };

    let member_roles = command
        .member
        .as_ref()
        .map(|member| member.roles.clone())
        .unwrap_or_default();
    let holds = |role_id: Option<u64>| {
        role_id
            .map(|id| member_roles.contains(&RoleId::new(id)))
            .unwrap_or(false)
    };

    let request = ResolveRequest {
        account_id: command.user.id.get(),
        token,
        has_base_role: holds(guild_settings.verified_role),
        has_qualified_role: holds(guild_settings.verified_living_role),
    };

    let resolution = match verification::resolve(db.as_ref(), &request, &guild_settings).await {
        Ok(resolution) => resolution,
        Err(VerifyError::MissingConfiguration(which)) => {
            error!("verification attempted in guild {guild_id} but the {which} role is not configured");
            return edit(
                &ctx,
                &command,
                "The verification roles are not set up on this server yet — ask the staff to configure them.",
            )
            .await;
        }
        Err(VerifyError::Database(e)) => {
            error!("verification lookup failed for {}: {e}", command.user.id);
            return edit(&ctx, &command, GENERIC_RETRY).await;
        }
    };

    if let Some(rewrite) = &resolution.requests.rewrite {
        if let Err(e) = db
            .rewrite_link(&rewrite.token, &rewrite.ckey, rewrite.account_id)
            .await
        {
            error!("could not record the link for {}: {e}", command.user.id);
            return edit(&ctx, &command, GENERIC_RETRY).await;
        }
        info!("linked {} to ckey {}", command.user.id, rewrite.ckey);
    }

    if let Err(e) =
        roles::apply_role_grants(&ctx, guild_id, command.user.id, &resolution.requests).await
    {
        // The link (if any) is already recorded; re-running /verify takes
        // the pre-existing path and retries the grants safely.
        error!("could not grant verification roles to {}: {e}", command.user.id);
        return edit(&ctx, &command, GENERIC_RETRY).await;
    }

    let content = match resolution.result {
        ResolutionResult::AlreadyVerified => "You are already verified.".to_string(),
        ResolutionResult::LinkedAndQualified { .. } => format!(
            "Congrats {}, your verification is complete.",
            command.user.name
        ),
        ResolutionResult::LinkedButUnqualified {
            living_minutes,
            required_minutes,
            ..
        } => format!(
            "Congrats {}, your verification is complete, but you have not yet lived {} minutes \
             as a crew member (you currently have {}). You can always verify again later by \
             running /verify with no token.",
            command.user.name, required_minutes, living_minutes
        ),
        ResolutionResult::NoLinkFound => {
            let mut content = format!(
                "Sorry {}, it looks like no ckey is linked to this Discord account. Go back into \
                 the game, generate a one-time token, and run /verify with it.",
                command.user.name
            );
            if !guild_settings.instructions_link.is_empty() {
                content.push_str(&format!(
                    " See {} for details.",
                    guild_settings.instructions_link
                ));
            }
            content.push_str(" If it still fails after a few attempts, contact the staff.");
            content
        }
        ResolutionResult::PlayerNotFound { ckey } => format!(
            "Sorry {}, we could not find a player record for {} — contact the staff.",
            command.user.name, ckey
        ),
    };
    edit(&ctx, &command, &content).await
}

async fn edit(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
) -> Result<(), serenity::Error> {
    command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(content))
        .await
        .map(|_| ())
}
