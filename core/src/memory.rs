//! In-memory ledger.
//!
//! Serves as the test double for the booking engine and as a standalone
//! store for demos. A transaction takes the single state lock for its whole
//! scope, so concurrent transactions serialize and every booking's
//! read-check-then-write sequence is atomic; rollback restores the snapshot
//! taken at [`Ledger::begin`].

use crate::error::{StoreError, StoreResult};
use crate::ledger::{Ledger, LedgerTransaction};
use crate::types::{Category, Event, EventId, Page, PageRequest, Ticket, TicketId, User, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Debug, Default)]
struct LedgerState {
    users: HashMap<UserId, User>,
    events: HashMap<EventId, Event>,
    // Vec rather than a map: queries page tickets in insertion order.
    tickets: Vec<Ticket>,
}

impl LedgerState {
    fn ticket_exists(&self, event_id: &EventId, place: u32, category: Category) -> bool {
        self.tickets
            .iter()
            .any(|t| t.occupies(event_id, place, category))
    }

    fn insert_ticket(&mut self, ticket: &Ticket) -> StoreResult<Ticket> {
        if self.ticket_exists(&ticket.event_id, ticket.place, ticket.category) {
            return Err(StoreError::UniqueViolation(format!(
                "seat ({}, {}, {}) is already occupied",
                ticket.event_id, ticket.place, ticket.category
            )));
        }
        self.tickets.push(ticket.clone());
        Ok(ticket.clone())
    }

    fn delete_ticket(&mut self, id: &TicketId) -> StoreResult<()> {
        let index = self
            .tickets
            .iter()
            .position(|t| t.id == *id)
            .ok_or(StoreError::NotFound)?;
        self.tickets.remove(index);
        Ok(())
    }

    fn page<'a>(
        tickets: impl Iterator<Item = &'a Ticket>,
        page: PageRequest,
    ) -> Page<Ticket> {
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = tickets
            .skip(offset)
            .take(page.size() as usize)
            .cloned()
            .collect();
        Page::new(items, page)
    }
}

/// In-memory [`Ledger`] over a shared, mutex-guarded state.
///
/// Clones share the same state.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live tickets, across all users and events.
    pub async fn ticket_count(&self) -> usize {
        self.state.lock().await.tickets.len()
    }
}

impl Ledger for InMemoryLedger {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> StoreResult<InMemoryTransaction> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = guard.clone();
        Ok(InMemoryTransaction {
            guard,
            snapshot: Some(snapshot),
        })
    }

    async fn user_exists(&self, id: &UserId) -> StoreResult<bool> {
        Ok(self.state.lock().await.users.contains_key(id))
    }

    async fn find_user(&self, id: &UserId) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(id).cloned())
    }

    async fn save_user(&self, user: &User) -> StoreResult<User> {
        self.state
            .lock()
            .await
            .users
            .insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn event_exists(&self, id: &EventId) -> StoreResult<bool> {
        Ok(self.state.lock().await.events.contains_key(id))
    }

    async fn find_event(&self, id: &EventId) -> StoreResult<Option<Event>> {
        Ok(self.state.lock().await.events.get(id).cloned())
    }

    async fn save_event(&self, event: &Event) -> StoreResult<Event> {
        self.state
            .lock()
            .await
            .events
            .insert(event.id.clone(), event.clone());
        Ok(event.clone())
    }

    async fn ticket_exists(
        &self,
        event_id: &EventId,
        place: u32,
        category: Category,
    ) -> StoreResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .ticket_exists(event_id, place, category))
    }

    async fn delete_ticket(&self, id: &TicketId) -> StoreResult<()> {
        self.state.lock().await.delete_ticket(id)
    }

    async fn tickets_by_user(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> StoreResult<Page<Ticket>> {
        let state = self.state.lock().await;
        Ok(LedgerState::page(
            state.tickets.iter().filter(|t| t.user_id == *user_id),
            page,
        ))
    }

    async fn tickets_by_event(
        &self,
        event_id: &EventId,
        page: PageRequest,
    ) -> StoreResult<Page<Ticket>> {
        let state = self.state.lock().await;
        Ok(LedgerState::page(
            state.tickets.iter().filter(|t| t.event_id == *event_id),
            page,
        ))
    }
}

/// Transaction over [`InMemoryLedger`].
///
/// Holds the state lock until committed, rolled back, or dropped; dropping
/// without a commit restores the snapshot taken when the transaction began.
#[derive(Debug)]
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<LedgerState>,
    // Taken by commit; restored by Drop while still present.
    snapshot: Option<LedgerState>,
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

impl LedgerTransaction for InMemoryTransaction {
    async fn user_exists(&mut self, id: &UserId) -> StoreResult<bool> {
        Ok(self.guard.users.contains_key(id))
    }

    async fn event_exists(&mut self, id: &EventId) -> StoreResult<bool> {
        Ok(self.guard.events.contains_key(id))
    }

    async fn ticket_exists(
        &mut self,
        event_id: &EventId,
        place: u32,
        category: Category,
    ) -> StoreResult<bool> {
        Ok(self.guard.ticket_exists(event_id, place, category))
    }

    async fn find_user(&mut self, id: &UserId) -> StoreResult<Option<User>> {
        Ok(self.guard.users.get(id).cloned())
    }

    async fn find_event(&mut self, id: &EventId) -> StoreResult<Option<Event>> {
        Ok(self.guard.events.get(id).cloned())
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<User> {
        self.guard.users.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn save_event(&mut self, event: &Event) -> StoreResult<Event> {
        self.guard.events.insert(event.id.clone(), event.clone());
        Ok(event.clone())
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> StoreResult<Ticket> {
        self.guard.insert_ticket(ticket)
    }

    async fn commit(mut self) -> StoreResult<()> {
        // Dropping the snapshot keeps the staged writes.
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        // Drop restores the snapshot.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn user(id: &str) -> User {
        User::new(UserId::new(id), "Alice", "alice@example.com", Decimal::new(10_000, 2))
    }

    fn event(id: &str) -> Event {
        Event::new(EventId::new(id), "Concert", Utc::now(), Decimal::new(6_000, 2))
    }

    fn ticket(user_id: &str, event_id: &str, place: u32, category: Category) -> Ticket {
        Ticket::new(
            TicketId::generate(),
            UserId::new(user_id),
            EventId::new(event_id),
            place,
            category,
        )
    }

    #[tokio::test]
    async fn committed_transaction_persists_writes() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().await.unwrap();
        tx.save_user(&user("u1")).await.unwrap();
        tx.insert_ticket(&ticket("u1", "e1", 1, Category::Bar))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(ledger.user_exists(&UserId::new("u1")).await.unwrap());
        assert!(ledger
            .ticket_exists(&EventId::new("e1"), 1, Category::Bar)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let ledger = InMemoryLedger::new();
        ledger.save_user(&user("u1")).await.unwrap();

        let mut tx = ledger.begin().await.unwrap();
        let mut altered = user("u1");
        altered.balance = Decimal::ZERO;
        tx.save_user(&altered).await.unwrap();
        tx.insert_ticket(&ticket("u1", "e1", 1, Category::Bar))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let stored = ledger.find_user(&UserId::new("u1")).await.unwrap().unwrap();
        assert_eq!(stored.balance, Decimal::new(10_000, 2));
        assert_eq!(ledger.ticket_count().await, 0);
    }

    #[tokio::test]
    async fn dropping_an_uncommitted_transaction_rolls_back() {
        let ledger = InMemoryLedger::new();
        {
            let mut tx = ledger.begin().await.unwrap();
            tx.insert_ticket(&ticket("u1", "e1", 1, Category::Bar))
                .await
                .unwrap();
            // dropped without commit
        }
        assert_eq!(ledger.ticket_count().await, 0);
    }

    #[tokio::test]
    async fn insert_ticket_enforces_seat_uniqueness() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().await.unwrap();
        tx.insert_ticket(&ticket("u1", "e1", 5, Category::Premium))
            .await
            .unwrap();
        let second = tx
            .insert_ticket(&ticket("u2", "e1", 5, Category::Premium))
            .await;
        assert!(matches!(second, Err(StoreError::UniqueViolation(_))));

        // Same place is free in another category and another event.
        tx.insert_ticket(&ticket("u2", "e1", 5, Category::Bar))
            .await
            .unwrap();
        tx.insert_ticket(&ticket("u2", "e2", 5, Category::Premium))
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn delete_ticket_reports_missing_ids() {
        let ledger = InMemoryLedger::new();
        let t = ticket("u1", "e1", 1, Category::Economy);
        let mut tx = ledger.begin().await.unwrap();
        tx.insert_ticket(&t).await.unwrap();
        tx.commit().await.unwrap();

        assert!(ledger.delete_ticket(&t.id).await.is_ok());
        assert_eq!(
            ledger.delete_ticket(&t.id).await,
            Err(StoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn paging_follows_insertion_order() {
        let ledger = InMemoryLedger::new();
        let mut tx = ledger.begin().await.unwrap();
        for place in 1..=5 {
            tx.insert_ticket(&ticket("u1", "e1", place, Category::Economy))
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        let first = ledger
            .tickets_by_user(&UserId::new("u1"), PageRequest::new(1, 2))
            .await
            .unwrap();
        let third = ledger
            .tickets_by_user(&UserId::new("u1"), PageRequest::new(3, 2))
            .await
            .unwrap();
        assert_eq!(
            first.items.iter().map(|t| t.place).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(
            third.items.iter().map(|t| t.place).collect::<Vec<_>>(),
            vec![5]
        );

        let beyond = ledger
            .tickets_by_event(&EventId::new("e1"), PageRequest::new(4, 2))
            .await
            .unwrap();
        assert!(beyond.is_empty());
    }
}
