//! The resource-dispenser bot ("astra"): slash-command lookups against the
//! static study-resource catalogue, plus a modal form for submitting new
//! links. Runs as its own process with its own token.

pub mod catalog;

use std::sync::Mutex;

use poise::serenity_prelude as serenity;
use poise::Modal as _;
use poise::serenity_prelude::Mentionable;

use crate::{env_var, Error};

pub type ResourceContext<'a> = poise::Context<'a, ResourceData, Error>;

#[derive(Debug, Clone)]
pub struct LinkSubmission {
    pub title: String,
    pub url: String,
    pub notes: Option<String>,
    pub submitted_by: serenity::UserId,
}

#[derive(Debug)]
pub struct ResourceData {
    /// Where user submissions are relayed for review, when configured.
    pub review_channel: Option<serenity::ChannelId>,
    pub submissions: Mutex<Vec<LinkSubmission>>,
}

pub fn valid_link(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Look up study resources for a board and subject
#[poise::command(slash_command)]
pub async fn resource(
    ctx: ResourceContext<'_>,
    #[description = "Exam board"] board: catalog::Board,
    #[description = "Subject"] subject: catalog::Subject,
) -> Result<(), Error> {
    let links = catalog::lookup(board, subject);
    if links.is_empty() {
        ctx.say(format!(
            "Nothing catalogued for {} {} yet — submit something with `/submitlink`!",
            board.label(),
            subject.label()
        ))
        .await?;
        return Ok(());
    }

    let listing = links
        .iter()
        .map(|link| format!("[{}]({})", link.title, link.url))
        .collect::<Vec<_>>()
        .join("\n");
    let embed = serenity::CreateEmbed::new()
        .title(format!("{} — {}", board.label(), subject.label()))
        .description(listing)
        .colour(serenity::Colour::TEAL)
        .timestamp(serenity::Timestamp::now());
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// See which boards and subjects are catalogued
#[poise::command(slash_command)]
pub async fn boards(ctx: ResourceContext<'_>) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title("Catalogued resources")
        .description(catalog::overview())
        .colour(serenity::Colour::TEAL)
        .timestamp(serenity::Timestamp::now());
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[derive(Debug, poise::Modal)]
#[name = "Submit a study resource"]
struct SubmitLinkModal {
    #[name = "Title"]
    #[placeholder = "e.g. Mechanics revision notes"]
    title: String,
    #[name = "Link (http or https)"]
    url: String,
    #[name = "Notes for reviewers"]
    #[paragraph]
    notes: Option<String>,
}

/// Submit a resource link for review
#[poise::command(slash_command)]
pub async fn submitlink(
    ctx: poise::ApplicationContext<'_, ResourceData, Error>,
) -> Result<(), Error> {
    let Some(form) = SubmitLinkModal::execute(ctx).await? else {
        return Ok(());
    };
    let reply_ctx = poise::Context::Application(ctx);

    if !valid_link(&form.url) {
        reply_ctx
            .send(
                poise::CreateReply::default()
                    .content("That link isn't an http(s) URL — nothing was submitted.")
                    .ephemeral(true),
            )
            .await?;
        return Ok(());
    }

    let submission = LinkSubmission {
        title: form.title.clone(),
        url: form.url.clone(),
        notes: form.notes.clone(),
        submitted_by: ctx.interaction.user.id,
    };
    ctx.data().submissions.lock().unwrap().push(submission);

    if let Some(review_channel) = ctx.data().review_channel {
        let mut embed = serenity::CreateEmbed::new()
            .title("New link submission")
            .description(format!("[{}]({})", form.title, form.url))
            .colour(serenity::Colour::GOLD)
            .timestamp(serenity::Timestamp::now())
            .field(
                "Submitted by",
                ctx.interaction.user.id.mention().to_string(),
                true,
            );
        if let Some(notes) = &form.notes {
            embed = embed.field("Notes", notes.clone(), false);
        }
        if let Err(e) = review_channel
            .send_message(
                ctx.serenity_context(),
                serenity::CreateMessage::new().embed(embed),
            )
            .await
        {
            log::error!("could not relay submission for review: {}", e);
        }
    }

    reply_ctx
        .send(
            poise::CreateReply::default()
                .content("Thanks! Your link has been submitted for review.")
                .ephemeral(true),
        )
        .await?;
    Ok(())
}

/// What this bot can do
#[poise::command(slash_command)]
pub async fn help(ctx: ResourceContext<'_>) -> Result<(), Error> {
    ctx.say(
        "`/resource <board> <subject>` — study links for a board and subject\n\
         `/boards` — everything that's catalogued\n\
         `/submitlink` — submit a new link for review",
    )
    .await?;
    Ok(())
}

async fn app() -> Result<(), Error> {
    let _ = dotenv::dotenv();

    let token: String = env_var("ASTRA_DISCORD_TOKEN")?;
    let review_channel = std::env::var("ASTRA_REVIEW_CHANNEL_ID")
        .ok()
        .map(|raw| {
            raw.parse::<u64>()
                .map(serenity::ChannelId::new)
                .map_err(|e| format!("Invalid ASTRA_REVIEW_CHANNEL_ID: {}", e))
        })
        .transpose()?;

    let options = poise::FrameworkOptions {
        commands: vec![resource(), boards(), submitlink(), help()],
        on_error: |error| {
            Box::pin(async move {
                log::warn!("astra error: {:?}", error);
                if let Err(e) = poise::builtins::on_error(error).await {
                    log::error!("error while handling error: {}", e);
                }
            })
        },
        ..Default::default()
    };

    let framework = poise::Framework::builder()
        .options(options)
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                log::info!("astra is online as {}", ready.user.name);
                Ok(ResourceData {
                    review_channel,
                    submissions: Mutex::new(Vec::new()),
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();
    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await?;
    client.start().await?;
    Ok(())
}

pub async fn main() {
    env_logger::init();

    if let Err(e) = app().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_validation_requires_http() {
        assert!(valid_link("https://example.com/notes.pdf"));
        assert!(valid_link("http://example.com"));
        assert!(!valid_link("ftp://example.com"));
        assert!(!valid_link("javascript:alert(1)"));
        assert!(!valid_link("example.com"));
    }
}
