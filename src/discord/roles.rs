use serenity::model::prelude::*;
use serenity::prelude::*;

use crate::verification::MutationRequests;

/// Applies the role grants surfaced by a resolution. Grants are idempotent
/// on the Discord side, so re-running a verification is harmless.
pub async fn apply_role_grants(
    ctx: &Context,
    guild_id: GuildId,
    user_id: UserId,
    requests: &MutationRequests,
) -> Result<(), serenity::Error> {
    if requests.grant_base.is_none() && requests.grant_qualified.is_none() {
        return Ok(());
    }
    let mut member = guild_id.member(&ctx.http, user_id).await?;
    if let Some(role_id) = requests.grant_base {
        member.add_role(&ctx.http, RoleId::new(role_id)).await?;
    }
    if let Some(role_id) = requests.grant_qualified {
        member.add_role(&ctx.http, RoleId::new(role_id)).await?;
    }
    Ok(())
}
