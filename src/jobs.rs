//! Background loops: feed polling and the bump reminder. Started once from
//! the first Ready event.

use std::sync::atomic::{AtomicBool, Ordering};

use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;

use crate::config::BotConfig;
use crate::social;

static JOBS_STARTED: AtomicBool = AtomicBool::new(false);

const BUMP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2 * 60 * 60);

pub fn start_jobs(ctx: serenity::Context, config: BotConfig, http: reqwest::Client) {
    if JOBS_STARTED.swap(true, Ordering::SeqCst) {
        return;
    }
    tokio::spawn(social::poll_feeds(ctx.clone(), http, config.clone()));
    tokio::spawn(bump_reminder(ctx, config));
}

async fn bump_reminder(ctx: serenity::Context, config: BotConfig) {
    loop {
        tokio::time::sleep(BUMP_INTERVAL).await;

        let result = config
            .bump_channel
            .send_message(
                &ctx,
                serenity::CreateMessage::new()
                    .content(format!(
                        "**Bump reminder** — the server can be bumped again! {}, use `/bump`.",
                        config.bump_role.mention()
                    ))
                    .allowed_mentions(
                        serenity::CreateAllowedMentions::new().roles(vec![config.bump_role]),
                    ),
            )
            .await;
        if let Err(e) = result {
            log::error!(
                "could not send bump reminder to {}: {}",
                config.bump_channel,
                e
            );
        }
    }
}
