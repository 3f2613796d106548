//! Server suggestions: numbered embeds with vote reactions and a discussion
//! thread per suggestion.

use std::sync::Mutex;

use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;

use crate::{modlog, Context, Error};

#[derive(Debug, Clone)]
pub struct Suggestion {
    pub id: u64,
    pub author: serenity::UserId,
    pub text: String,
    pub message_id: serenity::MessageId,
}

#[derive(Default)]
pub struct SuggestionLog {
    entries: Mutex<Vec<Suggestion>>,
}

impl SuggestionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, suggestion: Suggestion) {
        self.entries.lock().unwrap().push(suggestion);
    }

    pub fn all(&self) -> Vec<Suggestion> {
        self.entries.lock().unwrap().clone()
    }
}

/// Submit a suggestion for the server
///
/// ?suggest <your suggestion>
#[poise::command(prefix_command, slash_command, category = "Community")]
pub async fn suggest(
    ctx: Context<'_>,
    #[description = "Your suggestion"]
    #[rest]
    suggestion: String,
) -> Result<(), Error> {
    let data = ctx.data();
    let channel = data.config.suggestion_channel;
    let id = data.cases.next_case_id();

    let mut author = serenity::CreateEmbedAuthor::new(ctx.author().name.clone());
    if let Some(avatar) = ctx.author().avatar_url() {
        author = author.icon_url(avatar);
    }
    let embed = serenity::CreateEmbed::new()
        .title(format!("Suggestion #{}", id))
        .description(suggestion.clone())
        .author(author)
        .colour(serenity::Colour::BLUE)
        .timestamp(serenity::Timestamp::now())
        .footer(serenity::CreateEmbedFooter::new(
            "React ✅ to approve, ❌ to disapprove.",
        ));

    let message = match channel
        .send_message(ctx, serenity::CreateMessage::new().embed(embed))
        .await
    {
        Ok(message) => message,
        Err(e) => {
            log::error!("could not post suggestion to {}: {}", channel, e);
            ctx.say("The suggestion channel is unavailable right now — please tell staff.")
                .await?;
            return Ok(());
        }
    };
    message.react(ctx, '✅').await?;
    message.react(ctx, '❌').await?;

    // Discussion happens in a thread hanging off the suggestion itself.
    if let Err(e) = channel
        .create_thread_from_message(
            ctx,
            message.id,
            serenity::CreateThread::new(format!("Suggestion #{} discussion", id))
                .auto_archive_duration(serenity::AutoArchiveDuration::OneDay),
        )
        .await
    {
        log::warn!("could not open discussion thread for suggestion #{}: {}", id, e);
    }

    data.suggestions.record(Suggestion {
        id,
        author: ctx.author().id,
        text: suggestion.clone(),
        message_id: message.id,
    });

    ctx.say(format!("Suggestion #{} submitted. Thanks!", id))
        .await?;
    modlog::log_action(
        ctx.serenity_context(),
        &data.config,
        "Suggestion submitted",
        Some(ctx.author().mention().to_string()),
        None,
        &format!("Suggestion #{}: {}", id, suggestion),
        None,
    )
    .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestions_are_recorded_in_order() {
        let log = SuggestionLog::new();
        log.record(Suggestion {
            id: 1,
            author: serenity::UserId::new(1),
            text: "more study rooms".into(),
            message_id: serenity::MessageId::new(10),
        });
        log.record(Suggestion {
            id: 2,
            author: serenity::UserId::new(2),
            text: "weekly quiz night".into(),
            message_id: serenity::MessageId::new(11),
        });

        let all = log.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, 1);
        assert_eq!(all[1].text, "weekly quiz night");
    }
}
