//! Small utility commands.

use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;

use crate::{Context, Error};

/// Show this menu
#[poise::command(prefix_command, slash_command, track_edits, category = "Miscellaneous")]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"] command: Option<String>,
) -> Result<(), Error> {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            extra_text_at_bottom: "Type .help command for more info on a command.",
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}

/// Check the bot's latency
#[poise::command(prefix_command, slash_command, category = "Miscellaneous")]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    ctx.say(format!("Pong! Gateway latency is {}ms.", latency.as_millis()))
        .await?;
    Ok(())
}

/// Where to find the guides
#[poise::command(prefix_command, slash_command, category = "Miscellaneous")]
pub async fn guide(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(format!(
        "Guides and resources live in {}.",
        ctx.data().config.guide_channel.mention()
    ))
    .await?;
    Ok(())
}

/// Register slash commands (owner only)
#[poise::command(prefix_command, owners_only, hide_in_help)]
pub async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx).await?;
    Ok(())
}
