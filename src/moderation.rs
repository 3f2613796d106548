//! Staff moderation commands. Every action is written to the mod-log channel
//! and, where possible, announced to the target by DM.

use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;

use crate::{modlog, Context, Error};

/// Parses human-friendly durations like "30m", "2h 15m", "1day".
pub fn parse_duration(input: &str) -> Result<std::time::Duration, Error> {
    humantime::parse_duration(input)
        .map_err(|e| format!("Could not parse duration {:?}: {}", input, e).into())
}

/// Best-effort DM to the target of a moderation action.
async fn notify_user(
    ctx: &serenity::Context,
    user: serenity::UserId,
    action: &str,
    reason: &str,
    duration: Option<&str>,
) {
    let content = match duration {
        Some(duration) => format!(
            "You have been {} in the server for {}. Reason: {}",
            action, duration, reason
        ),
        None => format!("You have been {} in the server. Reason: {}", action, reason),
    };
    if let Err(e) = user
        .direct_message(ctx, serenity::CreateMessage::new().content(content))
        .await
    {
        log::warn!("could not notify {} about {}: {}", user, action, e);
    }
}

fn reason_or_default(reason: Option<String>) -> String {
    reason.unwrap_or_else(|| "No reason provided".to_owned())
}

/// Warn a member
///
/// ?warn <member> [reason]
///
/// Records a warning under a fresh case id and bumps the member's
/// infraction count.
#[poise::command(
    prefix_command,
    slash_command,
    check = "crate::checks::is_staff",
    category = "Moderation"
)]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "Member to warn"] member: serenity::Member,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    let data = ctx.data();
    let (case_id, infractions) = data
        .cases
        .record_warning(member.user.id, ctx.author().id, &reason);

    ctx.say(format!(
        "{} has been warned. Case {}.",
        member.mention(),
        case_id
    ))
    .await?;
    notify_user(
        ctx.serenity_context(),
        member.user.id,
        "warned",
        &reason,
        None,
    )
    .await;
    modlog::log_action(
        ctx.serenity_context(),
        &data.config,
        "Warn",
        Some(member.mention().to_string()),
        Some(ctx.author().mention().to_string()),
        &reason,
        Some(format!("Case {}, infractions: {}", case_id, infractions)),
    )
    .await;
    Ok(())
}

/// Time out a member
///
/// ?timeout <member> <duration> [reason]
///
/// Uses the platform's native communication disable, e.g. `?timeout @user
/// 30m spamming`.
#[poise::command(
    prefix_command,
    slash_command,
    check = "crate::checks::is_staff",
    category = "Moderation"
)]
pub async fn timeout(
    ctx: Context<'_>,
    #[description = "Member to time out"] member: serenity::Member,
    #[description = "Duration, e.g. 30m"] duration: String,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    let duration = parse_duration(&duration)?;
    let until = serenity::Timestamp::from_unix_timestamp(
        chrono::Utc::now().timestamp() + duration.as_secs() as i64,
    )?;

    if let Err(e) = member
        .guild_id
        .edit_member(
            ctx,
            member.user.id,
            serenity::EditMember::new().disable_communication_until_datetime(until),
        )
        .await
    {
        log::warn!("timeout of {} failed: {}", member.user.id, e);
        ctx.say(
            "I can't time that member out — my role must be above theirs and I need the \
             Moderate Members permission.",
        )
        .await?;
        return Ok(());
    }

    let pretty = humantime::format_duration(duration).to_string();
    ctx.say(format!(
        "{} has been timed out for {}.",
        member.mention(),
        pretty
    ))
    .await?;
    notify_user(
        ctx.serenity_context(),
        member.user.id,
        "timed out",
        &reason,
        Some(&pretty),
    )
    .await;
    modlog::log_action(
        ctx.serenity_context(),
        &ctx.data().config,
        "Timeout",
        Some(member.mention().to_string()),
        Some(ctx.author().mention().to_string()),
        &reason,
        Some(format!("Duration: {}", pretty)),
    )
    .await;
    Ok(())
}

/// Kick a member
///
/// ?kick <member> [reason]
#[poise::command(
    prefix_command,
    slash_command,
    check = "crate::checks::is_staff",
    category = "Moderation"
)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Member to kick"] member: serenity::Member,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    if let Err(e) = member
        .guild_id
        .kick_with_reason(ctx, member.user.id, &reason)
        .await
    {
        log::warn!("kick of {} failed: {}", member.user.id, e);
        ctx.say(
            "I can't kick that member — my role must be above theirs and I need the \
             Kick Members permission.",
        )
        .await?;
        return Ok(());
    }

    ctx.say(format!("{} has been kicked.", member.user.tag()))
        .await?;
    notify_user(ctx.serenity_context(), member.user.id, "kicked", &reason, None).await;
    modlog::log_action(
        ctx.serenity_context(),
        &ctx.data().config,
        "Kick",
        Some(member.mention().to_string()),
        Some(ctx.author().mention().to_string()),
        &reason,
        None,
    )
    .await;
    Ok(())
}

/// Ban a user
///
/// ?ban <user> [reason]
///
/// Works on users who already left, by id.
#[poise::command(
    prefix_command,
    slash_command,
    check = "crate::checks::is_staff",
    category = "Moderation"
)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "User to ban"] user: serenity::User,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    let guild_id = ctx
        .guild_id()
        .ok_or("This command can only be used in the server")?;

    if let Err(e) = guild_id.ban_with_reason(ctx, user.id, 0, &reason).await {
        log::warn!("ban of {} failed: {}", user.id, e);
        ctx.say(
            "I can't ban that user — my role must be above theirs and I need the \
             Ban Members permission.",
        )
        .await?;
        return Ok(());
    }

    ctx.say(format!("{} has been banned.", user.tag())).await?;
    notify_user(ctx.serenity_context(), user.id, "banned", &reason, None).await;
    modlog::log_action(
        ctx.serenity_context(),
        &ctx.data().config,
        "Ban",
        Some(user.mention().to_string()),
        Some(ctx.author().mention().to_string()),
        &reason,
        None,
    )
    .await;
    Ok(())
}

/// Temporarily ban a user
///
/// ?tempban <user> <duration> [reason]
///
/// Bans immediately and lifts the ban after the duration, e.g. `?tempban
/// @user 2h flooding`. The handling task sleeps through the ban; nothing
/// else is blocked.
#[poise::command(
    prefix_command,
    check = "crate::checks::is_staff",
    category = "Moderation"
)]
pub async fn tempban(
    ctx: Context<'_>,
    #[description = "User to ban"] user: serenity::User,
    #[description = "Duration, e.g. 2h"] duration: String,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    let duration = parse_duration(&duration)?;
    let pretty = humantime::format_duration(duration).to_string();
    let guild_id = ctx
        .guild_id()
        .ok_or("This command can only be used in the server")?;

    if let Err(e) = guild_id
        .ban_with_reason(
            ctx,
            user.id,
            0,
            &format!("Temporary ban ({}): {}", pretty, reason),
        )
        .await
    {
        log::warn!("tempban of {} failed: {}", user.id, e);
        ctx.say(
            "I can't ban that user — my role must be above theirs and I need the \
             Ban Members permission.",
        )
        .await?;
        return Ok(());
    }

    ctx.say(format!("{} has been banned for {}.", user.tag(), pretty))
        .await?;
    notify_user(
        ctx.serenity_context(),
        user.id,
        "temporarily banned",
        &reason,
        Some(&pretty),
    )
    .await;
    modlog::log_action(
        ctx.serenity_context(),
        &ctx.data().config,
        "Tempban",
        Some(user.mention().to_string()),
        Some(ctx.author().mention().to_string()),
        &reason,
        Some(format!("Duration: {}", pretty)),
    )
    .await;

    tokio::time::sleep(duration).await;

    if let Err(e) = guild_id.unban(ctx, user.id).await {
        log::error!("could not lift tempban for {}: {}", user.id, e);
        ctx.say(format!(
            "The tempban for {} expired but I could not lift it: {}",
            user.tag(),
            e
        ))
        .await?;
        return Ok(());
    }
    ctx.say(format!(
        "{}'s tempban has expired; they are unbanned.",
        user.tag()
    ))
    .await?;
    modlog::log_action(
        ctx.serenity_context(),
        &ctx.data().config,
        "Unban (tempban expired)",
        Some(user.mention().to_string()),
        None,
        &format!("Tempban of {} expired", pretty),
        None,
    )
    .await;
    Ok(())
}

/// Softban a member
///
/// ?softban <member> [reason]
///
/// Ban plus immediate unban, purging their messages from the last 7 days.
#[poise::command(
    prefix_command,
    check = "crate::checks::is_staff",
    category = "Moderation"
)]
pub async fn softban(
    ctx: Context<'_>,
    #[description = "Member to softban"] member: serenity::Member,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    let guild_id = member.guild_id;

    if let Err(e) = guild_id
        .ban_with_reason(ctx, member.user.id, 7, &reason)
        .await
    {
        log::warn!("softban of {} failed: {}", member.user.id, e);
        ctx.say(
            "I can't softban that member — my role must be above theirs and I need the \
             Ban Members permission.",
        )
        .await?;
        return Ok(());
    }
    guild_id.unban(ctx, member.user.id).await?;

    ctx.say(format!(
        "{} has been softbanned; their messages from the last 7 days are gone.",
        member.user.tag()
    ))
    .await?;
    notify_user(
        ctx.serenity_context(),
        member.user.id,
        "softbanned",
        &reason,
        None,
    )
    .await;
    modlog::log_action(
        ctx.serenity_context(),
        &ctx.data().config,
        "Softban",
        Some(member.mention().to_string()),
        Some(ctx.author().mention().to_string()),
        &reason,
        None,
    )
    .await;
    Ok(())
}

/// Unban a user by id
///
/// ?unban <user id> [reason]
#[poise::command(
    prefix_command,
    check = "crate::checks::is_staff",
    category = "Moderation"
)]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "Id of the banned user"] user_id: serenity::UserId,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    let guild_id = ctx
        .guild_id()
        .ok_or("This command can only be used in the server")?;

    let bans = guild_id.bans(ctx, None, None).await?;
    let Some(ban) = bans.iter().find(|ban| ban.user.id == user_id) else {
        ctx.say(format!("User `{}` is not banned.", user_id)).await?;
        return Ok(());
    };
    let banned_tag = ban.user.tag();

    guild_id.unban(ctx, user_id).await?;
    ctx.say(format!("{} has been unbanned.", banned_tag)).await?;
    modlog::log_action(
        ctx.serenity_context(),
        &ctx.data().config,
        "Unban",
        Some(user_id.mention().to_string()),
        Some(ctx.author().mention().to_string()),
        &reason,
        None,
    )
    .await;
    Ok(())
}

/// Set a channel's slowmode
///
/// ?slowmode [channel] <seconds>
///
/// 0 disables slowmode. Maximum 21600 seconds.
#[poise::command(
    prefix_command,
    check = "crate::checks::is_staff",
    category = "Moderation"
)]
pub async fn slowmode(
    ctx: Context<'_>,
    #[description = "Channel (defaults to here)"] channel: Option<serenity::GuildChannel>,
    #[description = "Seconds between messages"] seconds: u16,
) -> Result<(), Error> {
    if seconds > 21600 {
        ctx.say("Slowmode must be between 0 and 21600 seconds.")
            .await?;
        return Ok(());
    }
    let channel_id = channel
        .as_ref()
        .map(|c| c.id)
        .unwrap_or_else(|| ctx.channel_id());

    if let Err(e) = channel_id
        .edit(ctx, serenity::EditChannel::new().rate_limit_per_user(seconds))
        .await
    {
        log::warn!("slowmode edit on {} failed: {}", channel_id, e);
        ctx.say("I can't edit that channel — I need the Manage Channels permission.")
            .await?;
        return Ok(());
    }

    if seconds > 0 {
        ctx.say(format!(
            "Slowmode set to {} seconds in {}.",
            seconds,
            channel_id.mention()
        ))
        .await?;
    } else {
        ctx.say(format!("Slowmode disabled in {}.", channel_id.mention()))
            .await?;
    }
    modlog::log_action(
        ctx.serenity_context(),
        &ctx.data().config,
        "Slowmode",
        Some(channel_id.mention().to_string()),
        Some(ctx.author().mention().to_string()),
        &format!("{} seconds", seconds),
        None,
    )
    .await;
    Ok(())
}

fn everyone_overwrite(
    channel: &serenity::GuildChannel,
) -> (serenity::Permissions, serenity::Permissions) {
    let everyone = serenity::RoleId::new(channel.guild_id.get());
    channel
        .permission_overwrites
        .iter()
        .find(|o| o.kind == serenity::PermissionOverwriteType::Role(everyone))
        .map(|o| (o.allow, o.deny))
        .unwrap_or((
            serenity::Permissions::empty(),
            serenity::Permissions::empty(),
        ))
}

/// Lock a channel
///
/// ?lock [channel] [reason]
///
/// Denies Send Messages for @everyone. Locking an already-locked channel is
/// a no-op.
#[poise::command(
    prefix_command,
    check = "crate::checks::is_staff",
    category = "Moderation"
)]
pub async fn lock(
    ctx: Context<'_>,
    #[description = "Channel (defaults to here)"] channel: Option<serenity::GuildChannel>,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    let channel = match channel {
        Some(channel) => channel,
        None => ctx
            .guild_channel()
            .await
            .ok_or("This command can only be used in the server")?,
    };
    let everyone = serenity::RoleId::new(channel.guild_id.get());

    let (allow, deny) = everyone_overwrite(&channel);
    if deny.contains(serenity::Permissions::SEND_MESSAGES) {
        ctx.say(format!("{} is already locked.", channel.mention()))
            .await?;
        return Ok(());
    }

    let overwrite = serenity::PermissionOverwrite {
        allow: allow & !serenity::Permissions::SEND_MESSAGES,
        deny: deny | serenity::Permissions::SEND_MESSAGES,
        kind: serenity::PermissionOverwriteType::Role(everyone),
    };
    if let Err(e) = channel.id.create_permission(ctx, overwrite).await {
        log::warn!("lock of {} failed: {}", channel.id, e);
        ctx.say("I can't lock that channel — I need the Manage Channels permission.")
            .await?;
        return Ok(());
    }

    ctx.say(format!("{} is now locked.", channel.mention()))
        .await?;
    modlog::log_action(
        ctx.serenity_context(),
        &ctx.data().config,
        "Channel locked",
        Some(channel.mention().to_string()),
        Some(ctx.author().mention().to_string()),
        &reason,
        None,
    )
    .await;
    Ok(())
}

/// Unlock a channel
///
/// ?unlock [channel] [reason]
#[poise::command(
    prefix_command,
    check = "crate::checks::is_staff",
    category = "Moderation"
)]
pub async fn unlock(
    ctx: Context<'_>,
    #[description = "Channel (defaults to here)"] channel: Option<serenity::GuildChannel>,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    let channel = match channel {
        Some(channel) => channel,
        None => ctx
            .guild_channel()
            .await
            .ok_or("This command can only be used in the server")?,
    };
    let everyone = serenity::RoleId::new(channel.guild_id.get());

    let (allow, deny) = everyone_overwrite(&channel);
    if !deny.contains(serenity::Permissions::SEND_MESSAGES) {
        ctx.say(format!("{} is not locked.", channel.mention()))
            .await?;
        return Ok(());
    }

    let new_deny = deny & !serenity::Permissions::SEND_MESSAGES;
    let result = if allow.is_empty() && new_deny.is_empty() {
        channel
            .id
            .delete_permission(ctx, serenity::PermissionOverwriteType::Role(everyone))
            .await
    } else {
        channel
            .id
            .create_permission(
                ctx,
                serenity::PermissionOverwrite {
                    allow,
                    deny: new_deny,
                    kind: serenity::PermissionOverwriteType::Role(everyone),
                },
            )
            .await
    };
    if let Err(e) = result {
        log::warn!("unlock of {} failed: {}", channel.id, e);
        ctx.say("I can't unlock that channel — I need the Manage Channels permission.")
            .await?;
        return Ok(());
    }

    ctx.say(format!("{} is unlocked again.", channel.mention()))
        .await?;
    modlog::log_action(
        ctx.serenity_context(),
        &ctx.data().config,
        "Channel unlocked",
        Some(channel.mention().to_string()),
        Some(ctx.author().mention().to_string()),
        &reason,
        None,
    )
    .await;
    Ok(())
}

/// Bulk-delete recent messages
///
/// ?purge [amount]
///
/// Deletes the given number of messages (default 5, at most 100) plus the
/// invoking message.
#[poise::command(
    prefix_command,
    aliases("clear"),
    check = "crate::checks::is_staff",
    category = "Moderation"
)]
pub async fn purge(
    ctx: Context<'_>,
    #[description = "How many messages to delete"] amount: Option<u8>,
) -> Result<(), Error> {
    let amount = amount.unwrap_or(5).min(100);
    if amount == 0 {
        ctx.say("Give me a positive number of messages to purge.")
            .await?;
        return Ok(());
    }

    let messages = ctx
        .channel_id()
        .messages(
            ctx,
            serenity::GetMessages::new().limit(amount.saturating_add(1).min(100)),
        )
        .await?;
    let ids: Vec<serenity::MessageId> = messages.iter().map(|m| m.id).collect();
    let deleted = ids.len().saturating_sub(1);

    if let Err(e) = ctx.channel_id().delete_messages(ctx, ids).await {
        log::warn!("purge in {} failed: {}", ctx.channel_id(), e);
        ctx.say(
            "I can't purge here — I need the Manage Messages permission, and messages older \
             than 14 days can't be bulk-deleted.",
        )
        .await?;
        return Ok(());
    }

    ctx.say(format!("Purged {} messages.", deleted)).await?;
    modlog::log_action(
        ctx.serenity_context(),
        &ctx.data().config,
        "Purge",
        Some(ctx.channel_id().mention().to_string()),
        Some(ctx.author().mention().to_string()),
        &format!("Purged {} messages", deleted),
        None,
    )
    .await;
    Ok(())
}

/// Speak through the bot
///
/// ?say <message>
#[poise::command(
    prefix_command,
    check = "crate::checks::is_staff",
    category = "Moderation"
)]
pub async fn say(
    ctx: Context<'_>,
    #[description = "What the bot should say"]
    #[rest]
    message: String,
) -> Result<(), Error> {
    ctx.channel_id().say(ctx, &message).await?;
    modlog::log_action(
        ctx.serenity_context(),
        &ctx.data().config,
        "Bot say",
        None,
        Some(ctx.author().mention().to_string()),
        &message,
        None,
    )
    .await;
    Ok(())
}

/// Report a member to the moderation team
///
/// ?report <member> [reason]
///
/// Files the report in the mod-log channel. Anyone can use this.
#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn report(
    ctx: Context<'_>,
    #[description = "Member to report"] user: serenity::User,
    #[description = "What happened"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    let embed = serenity::CreateEmbed::new()
        .title("User report")
        .description(format!(
            "**Reported:** {}\n**Reported by:** {}\n**Reason:** {}",
            user.mention(),
            ctx.author().mention(),
            reason
        ))
        .colour(serenity::Colour::ORANGE)
        .timestamp(serenity::Timestamp::now())
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Reported in #{}",
            ctx.channel_id()
                .name(ctx)
                .await
                .unwrap_or_else(|_| "unknown".to_owned())
        )));

    if let Err(e) = ctx
        .data()
        .config
        .mod_log_channel
        .send_message(ctx, serenity::CreateMessage::new().embed(embed))
        .await
    {
        log::error!("could not file report: {}", e);
        ctx.say("Could not file the report — please ping a moderator directly.")
            .await?;
        return Ok(());
    }

    ctx.say(format!(
        "{} has been reported. The team will take a look.",
        user.tag()
    ))
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_parse_human_shorthand() {
        assert_eq!(parse_duration("30m").unwrap().as_secs(), 30 * 60);
        assert_eq!(
            parse_duration("2h 15m").unwrap().as_secs(),
            2 * 3600 + 15 * 60
        );
        assert!(parse_duration("soon").is_err());
    }
}
