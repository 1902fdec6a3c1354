use log::{error, info};
use serenity::model::prelude::*;
use serenity::prelude::*;

use crate::settings::{GuildSettings, SettingsStore};

/// Builds the greeting for a new member, or None when no greeting is
/// configured. `{member}` and `{guild}` placeholders are substituted, and
/// the bunker warning is appended while the bunker is up.
pub fn render_greeting(
    settings: &GuildSettings,
    member_mention: &str,
    guild_name: &str,
) -> Option<String> {
    let template = if settings.disabled {
        &settings.disabled_greeting
    } else {
        &settings.welcome_greeting
    };
    if template.is_empty() {
        return None;
    }

    let mut greeting = template
        .replace("{member}", member_mention)
        .replace("{guild}", guild_name);
    if settings.bunker && !settings.bunker_warning.is_empty() {
        greeting.push(' ');
        greeting.push_str(&settings.bunker_warning);
    }
    Some(greeting)
}

/// Greets a member in the configured welcome channel. Failures here are
/// logged and swallowed; a missed greeting must never break anything else.
pub async fn handle_member_join(ctx: &Context, settings_store: &SettingsStore, member: &Member) {
    let guild_id = member.guild_id;
    let settings = match settings_store.guild(guild_id.get()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("could not load settings for guild {guild_id}: {e}");
            return;
        }
    };

    let Some(channel_id) = settings.welcome_channel else {
        info!(
            "no welcome channel configured in guild {guild_id}, member joined: {}",
            member.user.name
        );
        return;
    };

    let guild_name = guild_id
        .name(&ctx.cache)
        .unwrap_or_else(|| guild_id.to_string());
    let Some(greeting) = render_greeting(&settings, &member.mention().to_string(), &guild_name)
    else {
        return;
    };

    if let Err(e) = ChannelId::new(channel_id).say(&ctx.http, greeting).await {
        info!("could not send a welcome message in guild {guild_id}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GuildSettings {
        GuildSettings {
            welcome_greeting: "Welcome {member} to {guild}!".to_string(),
            disabled_greeting: "Hi {member}, verification is down for maintenance.".to_string(),
            bunker_warning: "The bunker is up, new arrivals cannot join the game right now."
                .to_string(),
            ..GuildSettings::default()
        }
    }

    #[test]
    fn substitutes_member_and_guild() {
        let greeting = render_greeting(&settings(), "@Oranges", "Paradise").unwrap();
        assert_eq!(greeting, "Welcome @Oranges to Paradise!");
    }

    #[test]
    fn disabled_guild_uses_the_disabled_greeting() {
        let mut s = settings();
        s.disabled = true;
        let greeting = render_greeting(&s, "@Oranges", "Paradise").unwrap();
        assert_eq!(greeting, "Hi @Oranges, verification is down for maintenance.");
    }

    #[test]
    fn bunker_appends_the_warning() {
        let mut s = settings();
        s.bunker = true;
        let greeting = render_greeting(&s, "@Oranges", "Paradise").unwrap();
        assert!(greeting.starts_with("Welcome @Oranges to Paradise!"));
        assert!(greeting.ends_with("cannot join the game right now."));
    }

    #[test]
    fn bunker_without_a_warning_text_appends_nothing() {
        let mut s = settings();
        s.bunker = true;
        s.bunker_warning.clear();
        let greeting = render_greeting(&s, "@Oranges", "Paradise").unwrap();
        assert_eq!(greeting, "Welcome @Oranges to Paradise!");
    }

    #[test]
    fn empty_template_means_no_greeting() {
        let mut s = settings();
        s.welcome_greeting.clear();
        assert_eq!(render_greeting(&s, "@Oranges", "Paradise"), None);
    }
}
