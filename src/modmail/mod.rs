//! Modmail: relays user DMs into private staff threads and staff replies
//! back, tracking each conversation as a ticket with an explicit lifecycle.

pub mod recovery;
pub mod router;
pub mod store;

pub use store::{Ticket, TicketError, TicketId, TicketStatus, TicketStore};

use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;

use crate::{modlog, Context, Error};

/// Close a modmail ticket
///
/// ?modmailclose [ticket]
///
/// Closes the given ticket, or the ticket belonging to the current thread
/// when invoked inside one. The thread is archived and locked and the user
/// is notified.
#[poise::command(
    prefix_command,
    rename = "modmailclose",
    check = "crate::checks::is_staff",
    category = "Modmail"
)]
pub async fn modmail_close(
    ctx: Context<'_>,
    #[description = "Ticket number"] ticket: Option<u64>,
) -> Result<(), Error> {
    let data = ctx.data();
    let id = match ticket.or_else(|| {
        data.tickets
            .find_by_thread(ctx.channel_id())
            .map(|t| t.id)
    }) {
        Some(id) => id,
        None => {
            ctx.say("This is not a modmail thread. Pass a ticket number to close.")
                .await?;
            return Ok(());
        }
    };

    let ticket = match data.tickets.close(id) {
        Ok(ticket) => ticket,
        Err(e @ (TicketError::NotFound(_) | TicketError::AlreadyClosed(_))) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    // Announce inside the thread before archiving; archived threads reject
    // new messages.
    if let Err(e) = ticket
        .thread_id
        .say(
            ctx,
            format!(
                "Ticket #{} closed by {}. This thread is now archived.",
                ticket.id,
                ctx.author().mention()
            ),
        )
        .await
    {
        log::warn!("could not announce closure in thread {}: {}", ticket.thread_id, e);
    }
    if let Err(e) = ticket
        .thread_id
        .edit_thread(
            ctx,
            serenity::EditThread::new().archived(true).locked(true),
        )
        .await
    {
        log::warn!("could not archive thread {}: {}", ticket.thread_id, e);
        ctx.say("Ticket closed, but I could not archive the thread — check that I have the Manage Threads permission.")
            .await?;
    }

    if let Err(e) = ticket
        .user_id
        .direct_message(
            ctx,
            serenity::CreateMessage::new().content(format!(
                "Your modmail ticket #{} has been closed by staff. \
                 Messages you send here will not reach staff until it is reopened.",
                ticket.id
            )),
        )
        .await
    {
        log::warn!("could not notify {} of closure: {}", ticket.user_id, e);
    }

    ctx.say(format!("Ticket #{} closed.", ticket.id)).await?;
    modlog::log_action(
        ctx.serenity_context(),
        &data.config,
        "Modmail ticket closed",
        Some(ticket.user_id.mention().to_string()),
        Some(ctx.author().mention().to_string()),
        &format!("Ticket #{}", ticket.id),
        None,
    )
    .await;
    Ok(())
}

/// Reopen a closed modmail ticket
///
/// ?modmailopen <ticket>
///
/// Unarchives and unlocks the backing thread and lets the user send
/// messages again. Fails without changing anything if the thread no longer
/// exists.
#[poise::command(
    prefix_command,
    rename = "modmailopen",
    check = "crate::checks::is_staff",
    category = "Modmail"
)]
pub async fn modmail_open(
    ctx: Context<'_>,
    #[description = "Ticket number"] ticket: u64,
) -> Result<(), Error> {
    let data = ctx.data();
    let Some(record) = data.tickets.get(ticket) else {
        ctx.say(format!("Ticket #{} does not exist.", ticket)).await?;
        return Ok(());
    };

    // Verify the thread still resolves before touching ticket state, so a
    // failed reopen leaves the ticket closed.
    if ctx
        .serenity_context()
        .http
        .get_channel(record.thread_id)
        .await
        .is_err()
    {
        ctx.say(format!(
            "The thread for ticket #{} no longer exists; it cannot be reopened. \
             The user can be reached by a fresh conversation once this one is left closed.",
            ticket
        ))
        .await?;
        modlog::log_action(
            ctx.serenity_context(),
            &data.config,
            "Modmail reopen failed",
            Some(record.user_id.mention().to_string()),
            Some(ctx.author().mention().to_string()),
            &format!("Ticket #{}: thread missing", ticket),
            None,
        )
        .await;
        return Ok(());
    }

    let record = match data.tickets.reopen(ticket) {
        Ok(record) => record,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    if let Err(e) = record
        .thread_id
        .edit_thread(
            ctx,
            serenity::EditThread::new().archived(false).locked(false),
        )
        .await
    {
        log::warn!("could not unarchive thread {}: {}", record.thread_id, e);
    }
    if let Err(e) = record
        .thread_id
        .say(
            ctx,
            format!(
                "Ticket #{} reopened by {}.",
                record.id,
                ctx.author().mention()
            ),
        )
        .await
    {
        log::warn!("could not announce reopen in thread {}: {}", record.thread_id, e);
    }

    if let Err(e) = record
        .user_id
        .direct_message(
            ctx,
            serenity::CreateMessage::new().content(format!(
                "Your modmail ticket #{} has been reopened. You can send messages again.",
                record.id
            )),
        )
        .await
    {
        log::warn!("could not notify {} of reopen: {}", record.user_id, e);
    }

    ctx.say(format!("Ticket #{} reopened.", record.id)).await?;
    modlog::log_action(
        ctx.serenity_context(),
        &data.config,
        "Modmail ticket reopened",
        Some(record.user_id.mention().to_string()),
        Some(ctx.author().mention().to_string()),
        &format!("Ticket #{}", record.id),
        None,
    )
    .await;
    Ok(())
}
