//! Thread provisioning and the recovery transition for lost threads.
//!
//! Recovery preserves the ticket id: the replacement thread is created with
//! the same naming convention, the user and current staff are re-added, and
//! only the thread binding changes.

use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;

use crate::modlog;
use crate::modmail::store::Ticket;
use crate::{Data, Error};

pub fn thread_name(ticket_id: u64, user_name: &str) -> String {
    format!("Ticket #{} - {}", ticket_id, user_name)
}

/// Creates the private backing thread under the modmail channel and adds the
/// ticket owner plus every current holder of a staff role.
pub async fn provision_thread(
    ctx: &serenity::Context,
    data: &Data,
    ticket_id: u64,
    user_id: serenity::UserId,
    user_name: &str,
) -> Result<serenity::GuildChannel, Error> {
    let modmail = data.config.modmail_channel;
    let parent = modmail
        .to_channel(ctx)
        .await
        .map_err(|e| format!("modmail channel {} does not resolve: {}", modmail, e))?
        .guild()
        .ok_or("modmail channel is not a guild channel")?;

    let thread = modmail
        .create_thread(
            ctx,
            serenity::CreateThread::new(thread_name(ticket_id, user_name))
                .kind(serenity::ChannelType::PrivateThread)
                .auto_archive_duration(serenity::AutoArchiveDuration::OneDay),
        )
        .await?;

    ctx.http
        .add_thread_channel_member(thread.id, user_id)
        .await?;

    // Staff membership is read fresh on every provision so newly promoted
    // staff end up in recovered threads too.
    let members = parent.guild_id.members(&ctx.http, None, None).await?;
    for member in members {
        let is_staff = member
            .roles
            .iter()
            .any(|role| data.config.staff_role_ids.contains(role));
        if !is_staff || member.user.bot {
            continue;
        }
        if let Err(e) = ctx
            .http
            .add_thread_channel_member(thread.id, member.user.id)
            .await
        {
            log::warn!(
                "could not add staff member {} to thread {}: {}",
                member.user.id,
                thread.id,
                e
            );
        }
    }

    Ok(thread)
}

/// Resolves the ticket's backing thread, reconstructing it when it no longer
/// exists. Returns the thread id to forward into.
pub async fn ensure_thread(
    ctx: &serenity::Context,
    data: &Data,
    ticket: &Ticket,
) -> Result<serenity::ChannelId, Error> {
    if ctx.cache.channel(ticket.thread_id).is_some() {
        return Ok(ticket.thread_id);
    }

    // Not cached; try a direct fetch before declaring the thread lost.
    if ctx.http.get_channel(ticket.thread_id).await.is_ok() {
        return Ok(ticket.thread_id);
    }

    log::warn!(
        "thread {} for ticket #{} is gone, recreating",
        ticket.thread_id,
        ticket.id
    );
    recover(ctx, data, ticket).await
}

async fn recover(
    ctx: &serenity::Context,
    data: &Data,
    ticket: &Ticket,
) -> Result<serenity::ChannelId, Error> {
    data.tickets.begin_recovery(ticket.id)?;

    let user_name = ticket
        .user_id
        .to_user(ctx)
        .await
        .map(|user| user.name)
        .unwrap_or_else(|_| "unknown user".to_owned());

    // If provisioning fails here the ticket stays `Recovering`; the next
    // forwarding attempt re-enters recovery and tries again.
    let thread = provision_thread(ctx, data, ticket.id, ticket.user_id, &user_name).await?;
    data.tickets.complete_recovery(ticket.id, thread.id)?;

    // Messages sent between thread loss and now are gone; the user is told
    // rather than the gap being papered over.
    if let Err(e) = ticket
        .user_id
        .direct_message(
            ctx,
            serenity::CreateMessage::new().content(format!(
                "The staff-side thread for your ticket #{} was lost and has been recreated. \
                 You may need to resend your last message.",
                ticket.id
            )),
        )
        .await
    {
        log::warn!(
            "could not notify {} about recovered ticket #{}: {}",
            ticket.user_id,
            ticket.id,
            e
        );
    }

    modlog::log_action(
        ctx,
        &data.config,
        "Modmail thread recreated",
        Some(ticket.user_id.mention().to_string()),
        None,
        &format!("Ticket #{} rebound to a new thread", ticket.id),
        None,
    )
    .await;

    Ok(thread.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_names_follow_the_fixed_convention() {
        assert_eq!(thread_name(12, "mira"), "Ticket #12 - mira");
        // Recovery reuses the original id, so the name round-trips.
        assert_eq!(thread_name(12, "mira"), thread_name(12, "mira"));
    }
}
