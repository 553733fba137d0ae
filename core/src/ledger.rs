//! Ledger store abstraction.
//!
//! The ledger is the sole shared mutable resource of the booking system:
//! durable storage for users, events, and tickets. The engine holds no locks
//! of its own and relies on the store for both guarantees the booking
//! transaction needs: a transactional boundary ([`Ledger::begin`]) and an
//! atomic conditional insert for the seat triple
//! ([`LedgerTransaction::insert_ticket`]).
//!
//! Implementations in this workspace: [`InMemoryLedger`](crate::memory::InMemoryLedger)
//! and the PostgreSQL ledger in the `ticket-booking-postgres` crate.

use crate::error::StoreResult;
use crate::types::{Category, Event, EventId, Page, PageRequest, Ticket, TicketId, User, UserId};
use std::future::Future;

/// Durable entity store for users, events, and tickets.
///
/// Cheap to clone (implementations wrap a shared handle) and safe to call
/// from any number of concurrent tasks.
pub trait Ledger: Send + Sync {
    /// Transaction handle produced by [`Ledger::begin`].
    type Tx: LedgerTransaction;

    /// Opens a transaction spanning subsequent reads and writes.
    ///
    /// All writes made through the returned handle become durable together
    /// on [`LedgerTransaction::commit`] or not at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot open a transaction.
    fn begin(&self) -> impl Future<Output = StoreResult<Self::Tx>> + Send;

    /// Checks whether a user exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    fn user_exists(&self, id: &UserId) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Point lookup of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    fn find_user(&self, id: &UserId) -> impl Future<Output = StoreResult<Option<User>>> + Send;

    /// Creates or replaces a user record.
    ///
    /// Users are created through this call by code outside the booking core;
    /// the engine itself only rewrites existing users inside a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    fn save_user(&self, user: &User) -> impl Future<Output = StoreResult<User>> + Send;

    /// Checks whether an event exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    fn event_exists(&self, id: &EventId) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Point lookup of an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    fn find_event(&self, id: &EventId) -> impl Future<Output = StoreResult<Option<Event>>> + Send;

    /// Creates or replaces an event record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    fn save_event(&self, event: &Event) -> impl Future<Output = StoreResult<Event>> + Send;

    /// Checks whether a live ticket occupies the seat triple.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    fn ticket_exists(
        &self,
        event_id: &EventId,
        place: u32,
        category: Category,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Removes a ticket record by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`](crate::error::StoreError::NotFound)
    /// if no such ticket exists, or another error if the removal fails.
    fn delete_ticket(&self, id: &TicketId) -> impl Future<Output = StoreResult<()>> + Send;

    /// Pages through the tickets owned by a user, in the store's stable
    /// order. An unknown user yields an empty page, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    fn tickets_by_user(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> impl Future<Output = StoreResult<Page<Ticket>>> + Send;

    /// Pages through the tickets sold for an event, in the store's stable
    /// order. An unknown event yields an empty page, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    fn tickets_by_event(
        &self,
        event_id: &EventId,
        page: PageRequest,
    ) -> impl Future<Output = StoreResult<Page<Ticket>>> + Send;
}

/// A unit of work against the ledger.
///
/// Writes staged through a transaction are observable to its own reads but
/// to nobody else until [`commit`](Self::commit). Dropping an uncommitted
/// transaction rolls it back; implementations must also make the
/// read-check-then-write sequence of a booking appear atomic to concurrent
/// transactions (isolation, or at minimum the uniqueness guarantee of
/// [`insert_ticket`](Self::insert_ticket)).
pub trait LedgerTransaction: Send {
    /// Checks whether a user exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    fn user_exists(&mut self, id: &UserId) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Checks whether an event exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    fn event_exists(&mut self, id: &EventId) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Checks whether a live ticket occupies the seat triple.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    fn ticket_exists(
        &mut self,
        event_id: &EventId,
        place: u32,
        category: Category,
    ) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Point lookup of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    fn find_user(&mut self, id: &UserId) -> impl Future<Output = StoreResult<Option<User>>> + Send;

    /// Point lookup of an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    fn find_event(
        &mut self,
        id: &EventId,
    ) -> impl Future<Output = StoreResult<Option<Event>>> + Send;

    /// Stages a create-or-replace of a user record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    fn save_user(&mut self, user: &User) -> impl Future<Output = StoreResult<User>> + Send;

    /// Stages a create-or-replace of an event record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    fn save_event(&mut self, event: &Event) -> impl Future<Output = StoreResult<Event>> + Send;

    /// Stages a ticket insert, atomically conditional on the seat triple
    /// `(event_id, place, category)` being free.
    ///
    /// This is the authority on seat uniqueness: two transactions racing for
    /// the same seat cannot both succeed, the loser observes
    /// [`StoreError::UniqueViolation`](crate::error::StoreError::UniqueViolation).
    ///
    /// # Errors
    ///
    /// Returns `UniqueViolation` if the seat is taken, or another error if
    /// the store write fails.
    fn insert_ticket(&mut self, ticket: &Ticket) -> impl Future<Output = StoreResult<Ticket>> + Send;

    /// Makes all staged writes durable together.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails; no staged write is durable in
    /// that case.
    fn commit(self) -> impl Future<Output = StoreResult<()>> + Send;

    /// Discards all staged writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails while aborting; staged writes are
    /// discarded regardless.
    fn rollback(self) -> impl Future<Output = StoreResult<()>> + Send;
}
