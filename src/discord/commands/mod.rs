pub mod admin;
mod config;
mod lookup;
pub mod verify;

use serenity::builder::{CreateInteractionResponse, CreateInteractionResponseMessage};
use serenity::model::prelude::*;
use serenity::prelude::*;

pub(crate) async fn respond(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
) -> Result<(), serenity::Error> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(content),
            ),
        )
        .await
}

pub(crate) async fn respond_ephemeral(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
) -> Result<(), serenity::Error> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await
}

pub(crate) fn str_arg<'a>(args: &[ResolvedOption<'a>], name: &str) -> Option<&'a str> {
    args.iter().find(|o| o.name == name).and_then(|o| match &o.value {
        ResolvedValue::String(value) => Some(*value),
        _ => None,
    })
}

pub(crate) fn int_arg(args: &[ResolvedOption<'_>], name: &str) -> Option<i64> {
    args.iter().find(|o| o.name == name).and_then(|o| match &o.value {
        ResolvedValue::Integer(value) => Some(*value),
        _ => None,
    })
}

pub(crate) fn user_arg<'a>(args: &[ResolvedOption<'a>], name: &str) -> Option<&'a User> {
    args.iter().find(|o| o.name == name).and_then(|o| match &o.value {
        ResolvedValue::User(user, _) => Some(*user),
        _ => None,
    })
}

pub(crate) fn role_arg<'a>(args: &[ResolvedOption<'a>], name: &str) -> Option<&'a Role> {
    args.iter().find(|o| o.name == name).and_then(|o| match &o.value {
        ResolvedValue::Role(role) => Some(*role),
        _ => None,
    })
}

pub(crate) fn channel_arg<'a>(
    args: &[ResolvedOption<'a>],
    name: &str,
) -> Option<&'a PartialChannel> {
    args.iter().find(|o| o.name == name).and_then(|o| match &o.value {
        ResolvedValue::Channel(channel) => Some(*channel),
        _ => None,
    })
}
