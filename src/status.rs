//! Per-user availability statuses and the status-board embed.
//!
//! The board is a single bot-owned message in the status channel, edited in
//! place. When the stored handle goes stale the channel history is scanned
//! for the board before a new message is posted.

use std::collections::HashMap;
use std::sync::Mutex;

use poise::serenity_prelude as serenity;

use crate::{Context, Data, Error};

const BOARD_TITLE: &str = "Status Board";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Free,
    Sleeping,
    DoLater,
    Studying,
    Outside,
    OnBreak,
}

impl UserStatus {
    pub fn label(self) -> &'static str {
        match self {
            UserStatus::Free => "Free ✅",
            UserStatus::Sleeping => "Sleeping 😴",
            UserStatus::DoLater => "Do Later 🚧",
            UserStatus::Studying => "Studying 📚",
            UserStatus::Outside => "Outside 🚶",
            UserStatus::OnBreak => "On Break ☕",
        }
    }

    /// Reply used when somebody pings a user who has this status set.
    pub fn ping_reply(self, mention: &str) -> String {
        match self {
            UserStatus::Free => format!("{} is Free ✅ and should see your ping soon.", mention),
            UserStatus::Sleeping => {
                format!("{} is Sleeping 😴 — they'll reply once they're up.", mention)
            }
            UserStatus::DoLater => format!(
                "{} has things queued up 🚧 — catch them a bit later.",
                mention
            ),
            UserStatus::Studying => format!(
                "{} is Studying 📚 — they'll reply after their session.",
                mention
            ),
            UserStatus::Outside => format!("{} is Outside 🚶 — they'll be back.", mention),
            UserStatus::OnBreak => {
                format!("{} is On Break ☕ — they'll chat again soon.", mention)
            }
        }
    }
}

struct BoardInner {
    statuses: HashMap<serenity::UserId, UserStatus>,
    board_message: Option<serenity::MessageId>,
}

pub struct StatusBoard {
    inner: Mutex<BoardInner>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BoardInner {
                statuses: HashMap::new(),
                board_message: None,
            }),
        }
    }

    pub fn set(&self, user: serenity::UserId, status: UserStatus) {
        self.inner.lock().unwrap().statuses.insert(user, status);
    }

    /// Returns whether the user had a status to clear.
    pub fn clear(&self, user: serenity::UserId) -> bool {
        self.inner.lock().unwrap().statuses.remove(&user).is_some()
    }

    pub fn get(&self, user: serenity::UserId) -> Option<UserStatus> {
        self.inner.lock().unwrap().statuses.get(&user).copied()
    }

    pub fn snapshot(&self) -> Vec<(serenity::UserId, UserStatus)> {
        let inner = self.inner.lock().unwrap();
        inner.statuses.iter().map(|(u, s)| (*u, *s)).collect()
    }

    /// Drops users that stopped resolving (left the platform or the guild).
    pub fn remove_all(&self, users: &[serenity::UserId]) {
        let mut inner = self.inner.lock().unwrap();
        for user in users {
            inner.statuses.remove(user);
        }
    }

    fn board_message(&self) -> Option<serenity::MessageId> {
        self.inner.lock().unwrap().board_message
    }

    fn set_board_message(&self, message: Option<serenity::MessageId>) {
        self.inner.lock().unwrap().board_message = message;
    }
}

/// Re-renders the board embed and edits it into place, recreating the board
/// message when it has been deleted out from under the bot.
pub async fn update_board(ctx: &serenity::Context, data: &Data) -> Result<(), Error> {
    let channel = data.config.status_channel;

    let mut embed = serenity::CreateEmbed::new()
        .title(BOARD_TITLE)
        .description("Who's around right now. Set yours with `.free`, `.studying`, and friends.")
        .colour(serenity::Colour::DARK_GREEN)
        .timestamp(serenity::Timestamp::now());

    let entries = data.statuses.snapshot();
    let mut stale = Vec::new();
    let mut rendered = 0;
    for (user_id, status) in entries {
        match user_id.to_user(ctx).await {
            Ok(user) => {
                embed = embed.field(user.name.clone(), status.label(), true);
                rendered += 1;
            }
            Err(_) => stale.push(user_id),
        }
    }
    if !stale.is_empty() {
        data.statuses.remove_all(&stale);
    }
    if rendered == 0 {
        embed = embed.field(
            "Nothing here yet",
            "Nobody has set a status. Be the first!",
            false,
        );
    }

    if let Some(message_id) = data.statuses.board_message() {
        match channel
            .edit_message(
                ctx,
                message_id,
                serenity::EditMessage::new().embed(embed.clone()),
            )
            .await
        {
            Ok(_) => return Ok(()),
            Err(e) => {
                log::warn!("status board message {} is gone ({}), relocating", message_id, e);
                data.statuses.set_board_message(None);
            }
        }
    }

    // Lost the handle; the board may still exist further up the history.
    let bot_id = data.bot_user_id;
    let history = channel
        .messages(ctx, serenity::GetMessages::new().limit(100))
        .await?;
    for message in &history {
        let is_board = message.author.id == bot_id
            && message
                .embeds
                .first()
                .and_then(|e| e.title.as_deref())
                .map_or(false, |title| title == BOARD_TITLE);
        if is_board {
            channel
                .edit_message(
                    ctx,
                    message.id,
                    serenity::EditMessage::new().embed(embed),
                )
                .await?;
            data.statuses.set_board_message(Some(message.id));
            return Ok(());
        }
    }

    let message = channel
        .send_message(ctx, serenity::CreateMessage::new().embed(embed))
        .await?;
    data.statuses.set_board_message(Some(message.id));
    Ok(())
}

async fn set_status(ctx: Context<'_>, status: UserStatus, confirmation: &str) -> Result<(), Error> {
    ctx.data().statuses.set(ctx.author().id, status);
    ctx.say(confirmation).await?;
    if let Err(e) = update_board(ctx.serenity_context(), ctx.data()).await {
        log::error!("could not update status board: {}", e);
    }
    Ok(())
}

/// Set your status to Free
#[poise::command(prefix_command, aliases("f"), category = "Status")]
pub async fn free(ctx: Context<'_>) -> Result<(), Error> {
    set_status(ctx, UserStatus::Free, "Status set to `Free ✅`.").await
}

/// Set your status to Sleeping
#[poise::command(prefix_command, aliases("s"), category = "Status")]
pub async fn sleeping(ctx: Context<'_>) -> Result<(), Error> {
    set_status(ctx, UserStatus::Sleeping, "Status set to `Sleeping 😴`.").await
}

/// Set your status to Do Later
#[poise::command(prefix_command, aliases("d"), category = "Status")]
pub async fn dolater(ctx: Context<'_>) -> Result<(), Error> {
    set_status(ctx, UserStatus::DoLater, "Status set to `Do Later 🚧`.").await
}

/// Set your status to Studying
#[poise::command(prefix_command, aliases("st"), category = "Status")]
pub async fn studying(ctx: Context<'_>) -> Result<(), Error> {
    set_status(ctx, UserStatus::Studying, "Status set to `Studying 📚`.").await
}

/// Set your status to Outside
#[poise::command(prefix_command, aliases("o"), category = "Status")]
pub async fn outside(ctx: Context<'_>) -> Result<(), Error> {
    set_status(ctx, UserStatus::Outside, "Status set to `Outside 🚶`.").await
}

/// Set your status to On Break
#[poise::command(prefix_command, rename = "break", aliases("b"), category = "Status")]
pub async fn on_break(ctx: Context<'_>) -> Result<(), Error> {
    set_status(ctx, UserStatus::OnBreak, "Status set to `On Break ☕`.").await
}

/// Clear your status
#[poise::command(prefix_command, category = "Status")]
pub async fn clearstatus(ctx: Context<'_>) -> Result<(), Error> {
    if ctx.data().statuses.clear(ctx.author().id) {
        ctx.say("Status cleared.").await?;
        if let Err(e) = update_board(ctx.serenity_context(), ctx.data()).await {
            log::error!("could not update status board: {}", e);
        }
    } else {
        ctx.say("You don't have a status set.").await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(n: u64) -> serenity::UserId {
        serenity::UserId::new(n)
    }

    #[test]
    fn set_get_clear_round_trip() {
        let board = StatusBoard::new();
        assert_eq!(board.get(user(1)), None);

        board.set(user(1), UserStatus::Studying);
        assert_eq!(board.get(user(1)), Some(UserStatus::Studying));

        // Last write wins.
        board.set(user(1), UserStatus::Free);
        assert_eq!(board.get(user(1)), Some(UserStatus::Free));

        assert!(board.clear(user(1)));
        assert!(!board.clear(user(1)));
    }

    #[test]
    fn stale_users_are_dropped_from_the_snapshot() {
        let board = StatusBoard::new();
        board.set(user(1), UserStatus::Free);
        board.set(user(2), UserStatus::Sleeping);

        board.remove_all(&[user(1)]);
        let snapshot = board.snapshot();
        assert_eq!(snapshot, vec![(user(2), UserStatus::Sleeping)]);
    }

    #[test]
    fn ping_replies_name_the_status() {
        let reply = UserStatus::Studying.ping_reply("@mira");
        assert!(reply.contains("@mira"));
        assert!(reply.contains("Studying"));
    }
}
