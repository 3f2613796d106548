//! Moderation case bookkeeping and the mod-log channel feed.

use std::collections::HashMap;
use std::sync::Mutex;

use poise::serenity_prelude as serenity;

use crate::config::BotConfig;

pub type CaseId = u64;

#[derive(Debug, Clone)]
pub struct Warning {
    pub case_id: CaseId,
    pub reason: String,
    pub moderator: serenity::UserId,
    pub issued_at: chrono::DateTime<chrono::Utc>,
}

struct Inner {
    next_case: CaseId,
    warnings: HashMap<serenity::UserId, Vec<Warning>>,
    infractions: HashMap<serenity::UserId, u32>,
}

/// In-memory case ledger. One monotonic counter numbers every moderation
/// case and suggestion, matching how staff refer to them; ticket ids are a
/// separate sequence owned by the ticket store.
pub struct CaseLog {
    inner: Mutex<Inner>,
}

impl Default for CaseLog {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseLog {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_case: 1,
                warnings: HashMap::new(),
                infractions: HashMap::new(),
            }),
        }
    }

    pub fn next_case_id(&self) -> CaseId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_case;
        inner.next_case += 1;
        id
    }

    /// Records a warning and bumps the infraction counter. Returns the case
    /// id and the user's new infraction total.
    pub fn record_warning(
        &self,
        user: serenity::UserId,
        moderator: serenity::UserId,
        reason: &str,
    ) -> (CaseId, u32) {
        let mut inner = self.inner.lock().unwrap();
        let case_id = inner.next_case;
        inner.next_case += 1;
        inner.warnings.entry(user).or_default().push(Warning {
            case_id,
            reason: reason.to_owned(),
            moderator,
            issued_at: chrono::Utc::now(),
        });
        let count = inner.infractions.entry(user).or_insert(0);
        *count += 1;
        (case_id, *count)
    }

    pub fn warnings_for(&self, user: serenity::UserId) -> Vec<Warning> {
        self.inner
            .lock()
            .unwrap()
            .warnings
            .get(&user)
            .cloned()
            .unwrap_or_default()
    }

    pub fn infractions(&self, user: serenity::UserId) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .infractions
            .get(&user)
            .copied()
            .unwrap_or(0)
    }
}

/// Posts a moderation-action embed to the mod-log channel.
///
/// Failures are contained here: an unresolvable or unwritable log channel is
/// a configuration error that must never take down the action that was being
/// logged.
pub async fn log_action(
    ctx: &serenity::Context,
    config: &BotConfig,
    action: &str,
    target: Option<String>,
    moderator: Option<String>,
    reason: &str,
    details: Option<String>,
) {
    let mut embed = serenity::CreateEmbed::new()
        .title(format!("Mod log: {}", action))
        .colour(serenity::Colour::RED)
        .timestamp(serenity::Timestamp::now())
        .field(
            "Moderator",
            moderator.unwrap_or_else(|| "automatic".to_owned()),
            false,
        );
    if let Some(target) = target {
        embed = embed.field("Target", target, false);
    }
    embed = embed.field(
        "Reason",
        if reason.is_empty() {
            "No reason provided"
        } else {
            reason
        },
        false,
    );
    if let Some(details) = details {
        embed = embed.field("Details", details, false);
    }

    if let Err(e) = config
        .mod_log_channel
        .send_message(ctx, serenity::CreateMessage::new().embed(embed))
        .await
    {
        log::error!(
            "could not write to mod log channel {}: {}",
            config.mod_log_channel,
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(n: u64) -> serenity::UserId {
        serenity::UserId::new(n)
    }

    #[test]
    fn case_ids_are_shared_and_monotonic() {
        let log = CaseLog::new();
        let a = log.next_case_id();
        let (b, _) = log.record_warning(user(1), user(2), "spam");
        let c = log.next_case_id();
        assert!(a < b && b < c);
    }

    #[test]
    fn warnings_accumulate_with_infractions() {
        let log = CaseLog::new();
        assert_eq!(log.infractions(user(1)), 0);

        let (_, first) = log.record_warning(user(1), user(2), "spam");
        let (_, second) = log.record_warning(user(1), user(2), "more spam");
        assert_eq!((first, second), (1, 2));

        let warnings = log.warnings_for(user(1));
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].reason, "spam");
        assert!(log.warnings_for(user(3)).is_empty());
    }
}
