//! Routing of inbound messages between user DMs and staff threads.
//!
//! Classification is pure (store lookups plus message facts) so the lifecycle
//! rules are testable without a gateway connection; the Discord side effects
//! live in the `handle_*` functions called from the event handler.

use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;

use crate::modlog;
use crate::modmail::recovery;
use crate::modmail::store::{Ticket, TicketStore};
use crate::{Data, Error, PREFIX};

/// What to do with a direct message.
#[derive(Debug)]
pub enum DmRoute {
    /// No ticket on file for this user; provision one.
    CreateTicket,
    /// The user's conversation is closed; tell them so, forward nothing.
    RefuseClosed(Ticket),
    /// Forward into the ticket's thread.
    Forward(Ticket),
}

pub fn route_dm(store: &TicketStore, user: serenity::UserId) -> DmRoute {
    match store.find_by_user(user) {
        None => DmRoute::CreateTicket,
        Some(ticket) if ticket.is_live() => DmRoute::Forward(ticket),
        Some(ticket) => DmRoute::RefuseClosed(ticket),
    }
}

/// What to do with a message posted inside a modmail thread.
#[derive(Debug)]
pub enum ThreadRoute {
    /// Thread is not in the ticket table; defensive error notice.
    NotATicket,
    /// Ticket is closed; staff must reopen explicitly before replying.
    RefuseClosed(Ticket),
    /// Sender has no staff role; read-only observer, ignore silently.
    Observer,
    /// Relay to the ticket owner's DM channel.
    Relay(Ticket),
}

pub fn route_thread_reply(
    store: &TicketStore,
    thread: serenity::ChannelId,
    sender_is_staff: bool,
) -> ThreadRoute {
    let Some(ticket) = store.find_by_thread(thread) else {
        return ThreadRoute::NotATicket;
    };
    if !ticket.is_live() {
        return ThreadRoute::RefuseClosed(ticket);
    }
    if !sender_is_staff {
        return ThreadRoute::Observer;
    }
    ThreadRoute::Relay(ticket)
}

/// Handles a direct message from a user. Called for every DM that is not a
/// command invocation.
pub async fn handle_dm(
    ctx: &serenity::Context,
    data: &Data,
    msg: &serenity::Message,
) -> Result<(), Error> {
    if msg.content.starts_with(PREFIX) || msg.content.trim().is_empty() {
        return Ok(());
    }

    // Serialize check-then-create per user so two quick first messages
    // cannot mint two tickets.
    let guard = data.tickets.dm_guard(msg.author.id);
    let _creating = guard.lock().await;

    match route_dm(&data.tickets, msg.author.id) {
        DmRoute::CreateTicket => {
            let ticket = match open_ticket(ctx, data, &msg.author).await {
                Ok(ticket) => ticket,
                Err(e) => {
                    log::error!("failed to open ticket for {}: {}", msg.author.id, e);
                    msg.channel_id
                        .say(ctx, "Could not open a modmail ticket right now. Please try again later or contact staff directly.")
                        .await?;
                    return Ok(());
                }
            };
            msg.channel_id
                .say(
                    ctx,
                    format!(
                        "Ticket #{} opened. Staff will reply here as soon as they can.",
                        ticket.id
                    ),
                )
                .await?;
            modlog::log_action(
                ctx,
                &data.config,
                "Modmail ticket created",
                Some(msg.author.mention().to_string()),
                None,
                &format!("Ticket #{} opened", ticket.id),
                None,
            )
            .await;
            forward_into_thread(ctx, data, msg, &ticket).await
        }
        DmRoute::RefuseClosed(ticket) => {
            msg.channel_id
                .say(
                    ctx,
                    format!(
                        "Ticket #{} is closed. A staff member has to reopen it before this conversation can continue.",
                        ticket.id
                    ),
                )
                .await?;
            Ok(())
        }
        DmRoute::Forward(ticket) => forward_into_thread(ctx, data, msg, &ticket).await,
    }
}

/// Provisions the backing thread and records the ticket.
async fn open_ticket(
    ctx: &serenity::Context,
    data: &Data,
    user: &serenity::User,
) -> Result<Ticket, Error> {
    let id = data.tickets.reserve_id();
    let thread =
        recovery::provision_thread(ctx, data, id, user.id, &user.name).await?;
    Ok(data.tickets.register(id, user.id, thread.id))
}

/// Wraps the message with sender identity and timestamp and posts it into the
/// ticket's thread, running recovery first if the thread has gone missing.
async fn forward_into_thread(
    ctx: &serenity::Context,
    data: &Data,
    msg: &serenity::Message,
    ticket: &Ticket,
) -> Result<(), Error> {
    let thread_id = recovery::ensure_thread(ctx, data, ticket).await?;

    let mut author = serenity::CreateEmbedAuthor::new(msg.author.name.clone());
    if let Some(avatar) = msg.author.avatar_url() {
        author = author.icon_url(avatar);
    }
    let embed = serenity::CreateEmbed::new()
        .title(format!("Ticket #{} — message from user", ticket.id))
        .description(msg.content.clone())
        .author(author)
        .colour(serenity::Colour::PURPLE)
        .timestamp(serenity::Timestamp::now());

    thread_id
        .send_message(ctx, serenity::CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

/// Handles a message inside one of the modmail channel's threads.
pub async fn handle_thread_message(
    ctx: &serenity::Context,
    data: &Data,
    msg: &serenity::Message,
) -> Result<(), Error> {
    if msg.content.starts_with(PREFIX) {
        return Ok(());
    }

    let sender_is_staff = msg.member.as_ref().is_some_and(|member| {
        member
            .roles
            .iter()
            .any(|role| data.config.staff_role_ids.contains(role))
    });

    match route_thread_reply(&data.tickets, msg.channel_id, sender_is_staff) {
        ThreadRoute::NotATicket => {
            msg.channel_id
                .say(ctx, "This thread is not tracked as a modmail ticket.")
                .await?;
            Ok(())
        }
        ThreadRoute::RefuseClosed(ticket) => {
            msg.channel_id
                .say(
                    ctx,
                    format!(
                        "Ticket #{} is closed. Use `{}modmailopen {}` to reopen it before replying.",
                        ticket.id, PREFIX, ticket.id
                    ),
                )
                .await?;
            Ok(())
        }
        ThreadRoute::Observer => Ok(()),
        ThreadRoute::Relay(ticket) => relay_to_user(ctx, data, msg, &ticket).await,
    }
}

/// Delivers a staff reply to the ticket owner's DM channel, marking the staff
/// message with the delivery outcome. Failed deliveries are reported in the
/// thread and never retried automatically.
async fn relay_to_user(
    ctx: &serenity::Context,
    data: &Data,
    msg: &serenity::Message,
    ticket: &Ticket,
) -> Result<(), Error> {
    let user = match ticket.user_id.to_user(ctx).await {
        Ok(user) => user,
        Err(_) => {
            msg.channel_id
                .say(ctx, "The ticket owner no longer resolves to a user (they may have deleted their account). Cannot deliver the reply.")
                .await?;
            msg.react(ctx, '❌').await?;
            return Ok(());
        }
    };

    let mut author = serenity::CreateEmbedAuthor::new(msg.author.name.clone());
    if let Some(avatar) = msg.author.avatar_url() {
        author = author.icon_url(avatar);
    }
    let embed = serenity::CreateEmbed::new()
        .title(format!("Ticket #{} — reply from staff", ticket.id))
        .description(msg.content.clone())
        .author(author)
        .colour(serenity::Colour::BLUE)
        .timestamp(serenity::Timestamp::now());

    match user
        .direct_message(ctx, serenity::CreateMessage::new().embed(embed))
        .await
    {
        Ok(_) => {
            msg.react(ctx, '✅').await?;
            modlog::log_action(
                ctx,
                &data.config,
                "Modmail reply delivered",
                Some(user.mention().to_string()),
                Some(msg.author.mention().to_string()),
                &format!("Ticket #{}", ticket.id),
                None,
            )
            .await;
        }
        Err(e) => {
            log::warn!(
                "could not deliver staff reply for ticket #{}: {}",
                ticket.id,
                e
            );
            msg.channel_id
                .say(
                    ctx,
                    format!(
                        "Could not deliver the reply to {}: their DMs are closed to the bot. Ask them to allow server DMs and send the reply again.",
                        user.tag()
                    ),
                )
                .await?;
            msg.react(ctx, '❌').await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modmail::store::TicketStatus;

    fn store_with_ticket(user: u64, thread: u64) -> (TicketStore, Ticket) {
        let store = TicketStore::new();
        let id = store.reserve_id();
        let ticket = store.register(
            id,
            serenity::UserId::new(user),
            serenity::ChannelId::new(thread),
        );
        (store, ticket)
    }

    #[test]
    fn first_dm_creates_a_ticket() {
        let store = TicketStore::new();
        assert!(matches!(
            route_dm(&store, serenity::UserId::new(5)),
            DmRoute::CreateTicket
        ));
    }

    #[test]
    fn dm_to_live_ticket_forwards() {
        let (store, ticket) = store_with_ticket(5, 50);
        match route_dm(&store, serenity::UserId::new(5)) {
            DmRoute::Forward(t) => assert_eq!(t.id, ticket.id),
            other => panic!("expected Forward, got {:?}", other),
        }
    }

    #[test]
    fn dm_to_closed_ticket_is_refused_not_recreated() {
        let (store, ticket) = store_with_ticket(5, 50);
        store.close(ticket.id).unwrap();
        match route_dm(&store, serenity::UserId::new(5)) {
            DmRoute::RefuseClosed(t) => assert_eq!(t.status, TicketStatus::Closed),
            other => panic!("expected RefuseClosed, got {:?}", other),
        }
    }

    #[test]
    fn dm_during_recovery_still_forwards() {
        let (store, ticket) = store_with_ticket(5, 50);
        store.begin_recovery(ticket.id).unwrap();
        assert!(matches!(
            route_dm(&store, serenity::UserId::new(5)),
            DmRoute::Forward(_)
        ));
    }

    #[test]
    fn unknown_thread_is_not_a_ticket() {
        let store = TicketStore::new();
        assert!(matches!(
            route_thread_reply(&store, serenity::ChannelId::new(99), true),
            ThreadRoute::NotATicket
        ));
    }

    #[test]
    fn closed_ticket_requires_explicit_reopen() {
        let (store, ticket) = store_with_ticket(5, 50);
        store.close(ticket.id).unwrap();
        assert!(matches!(
            route_thread_reply(&store, serenity::ChannelId::new(50), true),
            ThreadRoute::RefuseClosed(_)
        ));
    }

    #[test]
    fn non_staff_senders_are_observers() {
        let (store, _ticket) = store_with_ticket(5, 50);
        assert!(matches!(
            route_thread_reply(&store, serenity::ChannelId::new(50), false),
            ThreadRoute::Observer
        ));
    }

    #[test]
    fn staff_replies_relay_to_the_user() {
        let (store, ticket) = store_with_ticket(5, 50);
        match route_thread_reply(&store, serenity::ChannelId::new(50), true) {
            ThreadRoute::Relay(t) => assert_eq!(t.user_id, ticket.user_id),
            other => panic!("expected Relay, got {:?}", other),
        }
    }

    #[test]
    fn closed_check_precedes_staff_check() {
        // A non-staff member posting in a closed ticket's thread still gets
        // the reopen notice rather than silence.
        let (store, ticket) = store_with_ticket(5, 50);
        store.close(ticket.id).unwrap();
        assert!(matches!(
            route_thread_reply(&store, serenity::ChannelId::new(50), false),
            ThreadRoute::RefuseClosed(_)
        ));
    }
}
