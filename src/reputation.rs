//! Reputation points awarded for helping out, and the profile command.

use std::collections::HashMap;
use std::sync::Mutex;

use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;

use crate::{Context, Error};

#[derive(Default)]
pub struct RepLedger {
    points: Mutex<HashMap<serenity::UserId, i64>>,
}

impl RepLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Awards one point and returns the user's new total.
    pub fn award(&self, user: serenity::UserId) -> i64 {
        let mut points = self.points.lock().unwrap();
        let total = points.entry(user).or_insert(0);
        *total += 1;
        *total
    }

    pub fn points(&self, user: serenity::UserId) -> i64 {
        self.points.lock().unwrap().get(&user).copied().unwrap_or(0)
    }
}

/// Whether a message reads as thanking somebody.
pub fn is_thanks(content: &str) -> bool {
    let content = content.to_lowercase();
    ["thank you", "thanks", "tysm", "ty!"]
        .iter()
        .any(|phrase| content.contains(phrase))
}

/// Show a member's reputation and moderation record
///
/// ?profile [user]
#[poise::command(prefix_command, slash_command, category = "Community")]
pub async fn profile(
    ctx: Context<'_>,
    #[description = "Whose profile to show"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let user = user.unwrap_or_else(|| ctx.author().clone());
    let data = ctx.data();

    let rep = data.reputation.points(user.id);
    let infractions = data.cases.infractions(user.id);
    let warnings = data.cases.warnings_for(user.id);

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("Profile: {}", user.name))
        .colour(serenity::Colour::BLUE)
        .timestamp(serenity::Timestamp::now())
        .field("Reputation", rep.to_string(), true)
        .field("Infractions", infractions.to_string(), true);
    if let Some(avatar) = user.avatar_url() {
        embed = embed.thumbnail(avatar);
    }

    if warnings.is_empty() {
        embed = embed.field("Warnings", "No warnings recorded.", false);
    } else {
        let listing = warnings
            .iter()
            .map(|w| {
                format!(
                    "**Case {}** — {} (by {}, {})",
                    w.case_id,
                    w.reason,
                    w.moderator.mention(),
                    w.issued_at.format("%Y-%m-%d %H:%M UTC")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field("Warnings", listing, false);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_accumulate_per_user() {
        let ledger = RepLedger::new();
        let alice = serenity::UserId::new(1);
        let bob = serenity::UserId::new(2);

        assert_eq!(ledger.award(alice), 1);
        assert_eq!(ledger.award(alice), 2);
        assert_eq!(ledger.points(alice), 2);
        assert_eq!(ledger.points(bob), 0);
    }

    #[test]
    fn thanks_detection_is_case_insensitive() {
        assert!(is_thanks("Thanks a lot!"));
        assert!(is_thanks("THANK YOU so much"));
        assert!(is_thanks("tysm!!"));
        assert!(!is_thanks("no gratitude here"));
    }
}
