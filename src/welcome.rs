//! New-member greeting and default role assignment.

use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;

use crate::{Data, Error};

pub async fn greet_new_member(
    ctx: &serenity::Context,
    data: &Data,
    member: &serenity::Member,
) -> Result<(), Error> {
    let config = &data.config;

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("Welcome, {}!", member.user.name))
        .description(format!(
            "Glad to have you here! Say hello, and check {} to get started. \
             Type `.help` to see what I can do.",
            config.guide_channel.mention()
        ))
        .colour(serenity::Colour::BLUE)
        .timestamp(serenity::Timestamp::now());
    if let Some(avatar) = member.user.avatar_url() {
        embed = embed.thumbnail(avatar);
    }

    if let Err(e) = config
        .welcome_channel
        .send_message(
            ctx,
            serenity::CreateMessage::new()
                .content(format!("Welcome {}!", member.mention()))
                .embed(embed),
        )
        .await
    {
        log::error!(
            "could not send welcome message to {}: {}",
            config.welcome_channel,
            e
        );
    }

    // Best effort; a misconfigured role must not break the join handling.
    if let Err(e) = ctx
        .http
        .add_member_role(
            member.guild_id,
            member.user.id,
            config.default_role,
            Some("New member default role"),
        )
        .await
    {
        log::warn!(
            "could not assign default role to {}: {}",
            member.user.id,
            e
        );
    }

    Ok(())
}
