// Moderator lookups: whois, discords, deverify.

use log::{error, info};
use serenity::builder::{
    CreateEmbed, CreateInteractionResponse, CreateInteractionResponseMessage,
};
use serenity::model::prelude::*;
use serenity::prelude::*;

use crate::gamedb::{Ckey, GameDatabase};

use super::{respond, str_arg, user_arg};

/// The ckey currently linked to a Discord user, if any.
pub(super) async fn whois(
    ctx: &Context,
    command: &CommandInteraction,
    db: &dyn GameDatabase,
    args: &[ResolvedOption<'_>],
) -> Result<(), serenity::Error> {
    let Some(user) = user_arg(args, "user") else {
        return respond(ctx, command, "Pick a user to look up.").await;
    };

    match db.find_valid_link_by_account(user.id.get()).await {
        Ok(Some(link)) => {
            respond(ctx, command, &format!("{} is linked to ckey `{}`.", user.name, link.ckey))
                .await
        }
        Ok(None) => respond(ctx, command, "That user has no linked ckey.").await,
        Err(e) => {
            error!("whois lookup failed for {}: {e}", user.id);
            respond(ctx, command, "There was a problem looking that user up.").await
        }
    }
}

/// Every Discord account a ckey has ever verified with.
pub(super) async fn discords(
    ctx: &Context,
    command: &CommandInteraction,
    db: &dyn GameDatabase,
    args: &[ResolvedOption<'_>],
) -> Result<(), serenity::Error> {
    let ckey = Ckey::normalise(str_arg(args, "ckey").unwrap_or_default());
    if ckey.is_empty() {
        return respond(ctx, command, "That is not a usable ckey.").await;
    }

    let links = match db.links_for_ckey(&ckey).await {
        Ok(links) => links,
        Err(e) => {
            error!("link history lookup failed for ckey {ckey}: {e}");
            return respond(ctx, command, "There was a problem collecting the link history.")
                .await;
        }
    };

    if links.is_empty() {
        return respond(ctx, command, "No Discord accounts have been linked to that ckey.")
            .await;
    }

    let mut lines = String::new();
    for link in &links {
        let account = link
            .discord_id
            .map(|id| format!("<@{id}>"))
            .unwrap_or_else(|| "unknown account".to_string());
        lines.push_str(&format!(
            "{} linked on {}, currently valid: {}\n",
            account,
            link.timestamp.format("%Y-%m-%d %H:%M UTC"),
            link.valid
        ));
    }

    let embed = CreateEmbed::new()
        .title(format!("Discord accounts linked to {ckey}"))
        .field("__Discord accounts__", lines, false);
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().embed(embed),
            ),
        )
        .await
}

/// Drops every valid link for the user's ckey. They will need a fresh
/// one-time token to verify again.
pub(super) async fn deverify(
    ctx: &Context,
    command: &CommandInteraction,
    db: &dyn GameDatabase,
    args: &[ResolvedOption<'_>],
) -> Result<(), serenity::Error> {
    let Some(user) = user_arg(args, "user") else {
        return respond(ctx, command, "Pick a user to deverify.").await;
    };

    let link = match db.find_valid_link_by_account(user.id.get()).await {
        Ok(Some(link)) => link,
        Ok(None) => return respond(ctx, command, "That user has no linked ckey.").await,
        Err(e) => {
            error!("deverify lookup failed for {}: {e}", user.id);
            return respond(ctx, command, "There was a problem looking that user up.").await;
        }
    };

    if let Err(e) = db.invalidate_links_for_ckey(&link.ckey).await {
        error!("deverify failed for ckey {}: {e}", link.ckey);
        return respond(ctx, command, "There was a problem deverifying that user.").await;
    }

    info!("deverified ckey {} (requested by {})", link.ckey, command.user.id);
    respond(
        ctx,
        command,
        &format!(
            "{} has been deverified. They will need to generate a new one-time token in game to \
             verify again.",
            user.name
        ),
    )
    .await
}
