//! Authoritative ticket bookkeeping for the modmail system.
//!
//! The store owns the `TicketId -> Ticket` map, the counter that mints new
//! ids, and the secondary indices (`user -> ticket`, `thread -> ticket`) that
//! the router resolves against. Ids are monotonic for the life of the process
//! and never reused; nothing is persisted, so a restart resets the sequence.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use poise::serenity_prelude::{ChannelId, UserId};

pub type TicketId = u64;

/// Lifecycle of a ticket.
///
/// `Recovering` means the backing thread went missing and a replacement is
/// being provisioned; the ticket still counts as the user's live conversation
/// while in that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Open,
    Closed,
    Recovering,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TicketStatus::Open => "open",
            TicketStatus::Closed => "closed",
            TicketStatus::Recovering => "recovering",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: TicketId,
    /// Conversation owner. Immutable after creation.
    pub user_id: UserId,
    /// Backing staff-side thread. Rewritten only by recovery.
    pub thread_id: ChannelId,
    pub status: TicketStatus,
}

impl Ticket {
    /// A live ticket accepts traffic from both sides.
    pub fn is_live(&self) -> bool {
        self.status != TicketStatus::Closed
    }
}

#[derive(Debug)]
pub enum TicketError {
    NotFound(TicketId),
    AlreadyClosed(TicketId),
    AlreadyOpen(TicketId),
    /// Reopening this ticket would give the user a second live conversation.
    UserBusy { ticket: TicketId, live: TicketId },
    NotRecovering(TicketId),
}

impl fmt::Display for TicketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketError::NotFound(id) => write!(f, "ticket #{} does not exist", id),
            TicketError::AlreadyClosed(id) => write!(f, "ticket #{} is already closed", id),
            TicketError::AlreadyOpen(id) => write!(f, "ticket #{} is already open", id),
            TicketError::UserBusy { ticket, live } => write!(
                f,
                "cannot reopen ticket #{}: the user already has live ticket #{}",
                ticket, live
            ),
            TicketError::NotRecovering(id) => {
                write!(f, "ticket #{} is not undergoing thread recovery", id)
            }
        }
    }
}

impl std::error::Error for TicketError {}

struct Inner {
    tickets: HashMap<TicketId, Ticket>,
    /// Each user's most recent ticket, any status. DM traffic resolves here.
    by_user: HashMap<UserId, TicketId>,
    /// Thread -> ticket, kept across close so stale threads still resolve.
    by_thread: HashMap<ChannelId, TicketId>,
    next_id: TicketId,
}

pub struct TicketStore {
    inner: Mutex<Inner>,
    /// Per-user guards serializing the DM check-then-create sequence, so two
    /// near-simultaneous first messages cannot mint two tickets.
    dm_guards: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

impl Default for TicketStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                tickets: HashMap::new(),
                by_user: HashMap::new(),
                by_thread: HashMap::new(),
                next_id: 1,
            }),
            dm_guards: Mutex::new(HashMap::new()),
        }
    }

    /// The guard to hold while resolving-or-creating a ticket for `user`.
    ///
    /// Callers lock the returned mutex across the whole provision sequence,
    /// including the thread-creation round trips.
    pub fn dm_guard(&self, user: UserId) -> Arc<tokio::sync::Mutex<()>> {
        let mut guards = self.dm_guards.lock().unwrap();
        guards
            .entry(user)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Mints the next ticket id. The thread naming convention embeds the id,
    /// so the id is allocated before the backing thread exists; if thread
    /// provisioning then fails, the id is burned, never reused.
    pub fn reserve_id(&self) -> TicketId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        id
    }

    /// Records a freshly provisioned ticket with status `Open`, under an id
    /// obtained from [`Self::reserve_id`].
    ///
    /// Assumes the caller already checked (under the user's guard) that the
    /// user has no live ticket.
    pub fn register(&self, id: TicketId, user: UserId, thread: ChannelId) -> Ticket {
        let mut inner = self.inner.lock().unwrap();
        let ticket = Ticket {
            id,
            user_id: user,
            thread_id: thread,
            status: TicketStatus::Open,
        };
        inner.tickets.insert(id, ticket.clone());
        inner.by_user.insert(user, id);
        inner.by_thread.insert(thread, id);
        ticket
    }

    pub fn get(&self, id: TicketId) -> Option<Ticket> {
        self.inner.lock().unwrap().tickets.get(&id).cloned()
    }

    /// The user's most recent ticket, whatever its status.
    pub fn find_by_user(&self, user: UserId) -> Option<Ticket> {
        let inner = self.inner.lock().unwrap();
        let id = inner.by_user.get(&user)?;
        inner.tickets.get(id).cloned()
    }

    pub fn find_by_thread(&self, thread: ChannelId) -> Option<Ticket> {
        let inner = self.inner.lock().unwrap();
        let id = inner.by_thread.get(&thread)?;
        inner.tickets.get(id).cloned()
    }

    /// `Open`/`Recovering` -> `Closed`. Closing a closed ticket is reported
    /// back to the caller as a no-op, not applied.
    pub fn close(&self, id: TicketId) -> Result<Ticket, TicketError> {
        let mut inner = self.inner.lock().unwrap();
        let ticket = inner.tickets.get_mut(&id).ok_or(TicketError::NotFound(id))?;
        if ticket.status == TicketStatus::Closed {
            return Err(TicketError::AlreadyClosed(id));
        }
        ticket.status = TicketStatus::Closed;
        Ok(ticket.clone())
    }

    /// `Closed` -> `Open`. Rejected if the ticket is already live, or if the
    /// user has meanwhile acquired a different live ticket (reopening would
    /// break the one-live-conversation-per-user rule).
    pub fn reopen(&self, id: TicketId) -> Result<Ticket, TicketError> {
        let mut inner = self.inner.lock().unwrap();
        let ticket = inner.tickets.get(&id).ok_or(TicketError::NotFound(id))?;
        if ticket.status != TicketStatus::Closed {
            return Err(TicketError::AlreadyOpen(id));
        }
        let user = ticket.user_id;
        if let Some(&current) = inner.by_user.get(&user) {
            if current != id {
                let live = inner
                    .tickets
                    .get(&current)
                    .filter(|t| t.is_live())
                    .map(|t| t.id);
                if let Some(live) = live {
                    return Err(TicketError::UserBusy { ticket: id, live });
                }
            }
        }
        let ticket = inner.tickets.get_mut(&id).unwrap();
        ticket.status = TicketStatus::Open;
        let ticket = ticket.clone();
        inner.by_user.insert(user, id);
        Ok(ticket)
    }

    /// Marks the ticket's thread as lost. `Open` -> `Recovering`.
    pub fn begin_recovery(&self, id: TicketId) -> Result<Ticket, TicketError> {
        let mut inner = self.inner.lock().unwrap();
        let ticket = inner.tickets.get_mut(&id).ok_or(TicketError::NotFound(id))?;
        match ticket.status {
            TicketStatus::Closed => Err(TicketError::AlreadyClosed(id)),
            _ => {
                ticket.status = TicketStatus::Recovering;
                Ok(ticket.clone())
            }
        }
    }

    /// Binds the replacement thread and returns the ticket to `Open`. The
    /// ticket id is unchanged; only the thread index is rewritten.
    pub fn complete_recovery(
        &self,
        id: TicketId,
        new_thread: ChannelId,
    ) -> Result<Ticket, TicketError> {
        let mut inner = self.inner.lock().unwrap();
        let old_thread = {
            let ticket = inner.tickets.get_mut(&id).ok_or(TicketError::NotFound(id))?;
            if ticket.status != TicketStatus::Recovering {
                return Err(TicketError::NotRecovering(id));
            }
            let old = ticket.thread_id;
            ticket.thread_id = new_thread;
            ticket.status = TicketStatus::Open;
            old
        };
        inner.by_thread.remove(&old_thread);
        inner.by_thread.insert(new_thread, id);
        Ok(inner.tickets[&id].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(n: u64) -> UserId {
        UserId::new(n)
    }

    fn thread(n: u64) -> ChannelId {
        ChannelId::new(n)
    }

    fn create(store: &TicketStore, u: UserId, th: ChannelId) -> Ticket {
        let id = store.reserve_id();
        store.register(id, u, th)
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let store = TicketStore::new();
        let a = create(&store, user(1), thread(100));
        let b = create(&store, user(2), thread(200));
        assert!(b.id > a.id);

        // A burned reservation (failed thread provisioning) still advances
        // the sequence.
        let _burned = store.reserve_id();
        store.close(a.id).unwrap();
        let c = create(&store, user(3), thread(300));
        assert!(c.id > b.id + 1);
    }

    #[test]
    fn resolves_by_user_and_by_thread() {
        let store = TicketStore::new();
        let t = create(&store, user(7), thread(70));

        assert_eq!(store.find_by_user(user(7)).unwrap().id, t.id);
        assert_eq!(store.find_by_thread(thread(70)).unwrap().id, t.id);
        assert!(store.find_by_user(user(8)).is_none());
        assert!(store.find_by_thread(thread(71)).is_none());
    }

    #[test]
    fn close_is_rejected_when_already_closed() {
        let store = TicketStore::new();
        let t = create(&store, user(1), thread(10));

        let closed = store.close(t.id).unwrap();
        assert_eq!(closed.status, TicketStatus::Closed);
        assert!(matches!(
            store.close(t.id),
            Err(TicketError::AlreadyClosed(_))
        ));
    }

    #[test]
    fn closed_tickets_still_resolve_from_both_indices() {
        let store = TicketStore::new();
        let t = create(&store, user(1), thread(10));
        store.close(t.id).unwrap();

        let by_user = store.find_by_user(user(1)).unwrap();
        assert_eq!(by_user.status, TicketStatus::Closed);
        let by_thread = store.find_by_thread(thread(10)).unwrap();
        assert_eq!(by_thread.id, t.id);
    }

    #[test]
    fn reopen_round_trip() {
        let store = TicketStore::new();
        let t = create(&store, user(1), thread(10));
        store.close(t.id).unwrap();

        let reopened = store.reopen(t.id).unwrap();
        assert_eq!(reopened.status, TicketStatus::Open);
        assert!(matches!(
            store.reopen(t.id),
            Err(TicketError::AlreadyOpen(_))
        ));
    }

    #[test]
    fn reopen_rejected_while_user_has_newer_live_ticket() {
        let store = TicketStore::new();
        let first = create(&store, user(1), thread(10));
        store.close(first.id).unwrap();
        let second = create(&store, user(1), thread(11));

        match store.reopen(first.id) {
            Err(TicketError::UserBusy { ticket, live }) => {
                assert_eq!(ticket, first.id);
                assert_eq!(live, second.id);
            }
            other => panic!("expected UserBusy, got {:?}", other),
        }
    }

    #[test]
    fn recovery_rebinds_the_thread_but_keeps_the_id() {
        let store = TicketStore::new();
        let t = create(&store, user(1), thread(10));

        let recovering = store.begin_recovery(t.id).unwrap();
        assert_eq!(recovering.status, TicketStatus::Recovering);
        assert!(recovering.is_live());

        let recovered = store.complete_recovery(t.id, thread(99)).unwrap();
        assert_eq!(recovered.id, t.id);
        assert_eq!(recovered.thread_id, thread(99));
        assert_eq!(recovered.status, TicketStatus::Open);

        assert!(store.find_by_thread(thread(10)).is_none());
        assert_eq!(store.find_by_thread(thread(99)).unwrap().id, t.id);
    }

    #[test]
    fn recovery_transitions_are_guarded() {
        let store = TicketStore::new();
        let t = create(&store, user(1), thread(10));

        assert!(matches!(
            store.complete_recovery(t.id, thread(99)),
            Err(TicketError::NotRecovering(_))
        ));

        store.close(t.id).unwrap();
        assert!(matches!(
            store.begin_recovery(t.id),
            Err(TicketError::AlreadyClosed(_))
        ));
    }

    #[test]
    fn dm_guard_is_shared_per_user() {
        let store = TicketStore::new();
        let a1 = store.dm_guard(user(1));
        let a2 = store.dm_guard(user(1));
        let b = store.dm_guard(user(2));

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }
}
