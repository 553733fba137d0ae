//! End-to-end booking, cancellation, and query scenarios, including the
//! all-or-nothing guarantee under injected store faults.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use ticket_booking_core::{
    BookingError, Category, Event, EventId, InMemoryLedger, InMemoryTransaction, Ledger,
    LedgerTransaction, Page, PageRequest, StoreError, StoreResult, Ticket, TicketId,
    TicketService, User, UserId,
};

async fn seeded_service(balance: Decimal, price: Decimal) -> TicketService<InMemoryLedger> {
    let service = TicketService::new(InMemoryLedger::new());
    service
        .ledger()
        .save_user(&User::new(
            UserId::new("u1"),
            "Alice",
            "alice@example.com",
            balance,
        ))
        .await
        .unwrap();
    service
        .ledger()
        .save_event(&Event::new(
            EventId::new("e1"),
            "Concert",
            Utc::now(),
            price,
        ))
        .await
        .unwrap();
    service
}

async fn balance_of(ledger: &InMemoryLedger, id: &str) -> Decimal {
    ledger
        .find_user(&UserId::new(id))
        .await
        .unwrap()
        .unwrap()
        .balance
}

#[tokio::test]
async fn successful_booking_debits_exactly_the_ticket_price() {
    // User with 100, event priced 60: booking succeeds and leaves 40.
    let service = seeded_service(dec!(100), dec!(60)).await;

    let ticket = service
        .book_ticket(&UserId::new("u1"), &EventId::new("e1"), 5, Category::Bar)
        .await
        .unwrap();

    assert_eq!(ticket.user_id, UserId::new("u1"));
    assert_eq!(ticket.event_id, EventId::new("e1"));
    assert_eq!(ticket.place, 5);
    assert_eq!(ticket.category, Category::Bar);

    assert_eq!(balance_of(service.ledger(), "u1").await, dec!(40));
    assert!(service
        .ledger()
        .ticket_exists(&EventId::new("e1"), 5, Category::Bar)
        .await
        .unwrap());
}

#[tokio::test]
async fn rebooking_the_same_seat_is_a_conflict_and_leaves_state_untouched() {
    let service = seeded_service(dec!(100), dec!(60)).await;

    service
        .book_ticket(&UserId::new("u1"), &EventId::new("e1"), 5, Category::Bar)
        .await
        .unwrap();
    let err = service
        .book_ticket(&UserId::new("u1"), &EventId::new("e1"), 5, Category::Bar)
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::SeatTaken { place: 5, .. }));
    assert_eq!(balance_of(service.ledger(), "u1").await, dec!(40));
    assert_eq!(service.ledger().ticket_count().await, 1);
}

#[tokio::test]
async fn insufficient_funds_rejects_without_any_mutation() {
    let service = seeded_service(dec!(10), dec!(60)).await;

    let err = service
        .book_ticket(&UserId::new("u1"), &EventId::new("e1"), 5, Category::Bar)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BookingError::InsufficientFunds { balance, price, .. }
            if balance == dec!(10) && price == dec!(60)
    ));
    assert_eq!(balance_of(service.ledger(), "u1").await, dec!(10));
    assert_eq!(service.ledger().ticket_count().await, 0);
}

#[tokio::test]
async fn cancel_removes_the_record_and_reports_missing_ids() {
    let service = seeded_service(dec!(100), dec!(60)).await;
    let ticket = service
        .book_ticket(&UserId::new("u1"), &EventId::new("e1"), 5, Category::Bar)
        .await
        .unwrap();

    assert!(service.cancel_ticket(&ticket.id).await);
    assert_eq!(service.ledger().ticket_count().await, 0);

    // Second attempt, and an id that never existed: both just `false`.
    assert!(!service.cancel_ticket(&ticket.id).await);
    assert!(!service.cancel_ticket(&TicketId::new("no-such-ticket")).await);
}

#[tokio::test]
async fn user_with_no_tickets_gets_an_empty_page() {
    let service = seeded_service(dec!(100), dec!(60)).await;

    let page = service
        .booked_tickets_by_user(&UserId::new("u1"), PageRequest::new(1, 10))
        .await
        .unwrap();
    assert!(page.is_empty());

    // Unknown ids are also empty-but-valid, not errors.
    let page = service
        .booked_tickets_by_user(&UserId::new("nobody"), PageRequest::new(1, 10))
        .await
        .unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn queries_page_through_bookings_in_order() {
    let service = seeded_service(dec!(1000), dec!(60)).await;
    for place in 1..=5 {
        service
            .book_ticket(&UserId::new("u1"), &EventId::new("e1"), place, Category::Economy)
            .await
            .unwrap();
    }

    let by_user = service
        .booked_tickets_by_user(&UserId::new("u1"), PageRequest::new(2, 2))
        .await
        .unwrap();
    assert_eq!(
        by_user.items.iter().map(|t| t.place).collect::<Vec<_>>(),
        vec![3, 4]
    );

    let by_event = service
        .booked_tickets_by_event(&EventId::new("e1"), PageRequest::new(3, 2))
        .await
        .unwrap();
    assert_eq!(
        by_event.items.iter().map(|t| t.place).collect::<Vec<_>>(),
        vec![5]
    );
}

// ============================================================================
// Fault injection: the four-way mutation is all-or-nothing
// ============================================================================

/// Ledger wrapper whose transactions fail on `save_event`, simulating a
/// store fault after the ticket insert and user save already happened.
#[derive(Clone)]
struct SaveEventFaults {
    inner: InMemoryLedger,
}

struct SaveEventFaultsTx {
    inner: InMemoryTransaction,
}

impl Ledger for SaveEventFaults {
    type Tx = SaveEventFaultsTx;

    async fn begin(&self) -> StoreResult<SaveEventFaultsTx> {
        Ok(SaveEventFaultsTx {
            inner: self.inner.begin().await?,
        })
    }

    async fn user_exists(&self, id: &UserId) -> StoreResult<bool> {
        self.inner.user_exists(id).await
    }

    async fn find_user(&self, id: &UserId) -> StoreResult<Option<User>> {
        self.inner.find_user(id).await
    }

    async fn save_user(&self, user: &User) -> StoreResult<User> {
        self.inner.save_user(user).await
    }

    async fn event_exists(&self, id: &EventId) -> StoreResult<bool> {
        self.inner.event_exists(id).await
    }

    async fn find_event(&self, id: &EventId) -> StoreResult<Option<Event>> {
        self.inner.find_event(id).await
    }

    async fn save_event(&self, event: &Event) -> StoreResult<Event> {
        self.inner.save_event(event).await
    }

    async fn ticket_exists(
        &self,
        event_id: &EventId,
        place: u32,
        category: Category,
    ) -> StoreResult<bool> {
        self.inner.ticket_exists(event_id, place, category).await
    }

    async fn delete_ticket(&self, id: &TicketId) -> StoreResult<()> {
        self.inner.delete_ticket(id).await
    }

    async fn tickets_by_user(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> StoreResult<Page<Ticket>> {
        self.inner.tickets_by_user(user_id, page).await
    }

    async fn tickets_by_event(
        &self,
        event_id: &EventId,
        page: PageRequest,
    ) -> StoreResult<Page<Ticket>> {
        self.inner.tickets_by_event(event_id, page).await
    }
}

impl LedgerTransaction for SaveEventFaultsTx {
    async fn user_exists(&mut self, id: &UserId) -> StoreResult<bool> {
        self.inner.user_exists(id).await
    }

    async fn event_exists(&mut self, id: &EventId) -> StoreResult<bool> {
        self.inner.event_exists(id).await
    }

    async fn ticket_exists(
        &mut self,
        event_id: &EventId,
        place: u32,
        category: Category,
    ) -> StoreResult<bool> {
        self.inner.ticket_exists(event_id, place, category).await
    }

    async fn find_user(&mut self, id: &UserId) -> StoreResult<Option<User>> {
        self.inner.find_user(id).await
    }

    async fn find_event(&mut self, id: &EventId) -> StoreResult<Option<Event>> {
        self.inner.find_event(id).await
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<User> {
        self.inner.save_user(user).await
    }

    async fn save_event(&mut self, _event: &Event) -> StoreResult<Event> {
        Err(StoreError::Backend("injected fault: save_event".to_string()))
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> StoreResult<Ticket> {
        self.inner.insert_ticket(ticket).await
    }

    async fn commit(self) -> StoreResult<()> {
        self.inner.commit().await
    }

    async fn rollback(self) -> StoreResult<()> {
        self.inner.rollback().await
    }
}

#[tokio::test]
async fn a_fault_after_the_ticket_insert_leaves_no_observable_state() {
    let inner = InMemoryLedger::new();
    inner
        .save_user(&User::new(
            UserId::new("u1"),
            "Alice",
            "alice@example.com",
            dec!(100),
        ))
        .await
        .unwrap();
    inner
        .save_event(&Event::new(
            EventId::new("e1"),
            "Concert",
            Utc::now(),
            dec!(60),
        ))
        .await
        .unwrap();

    let service = TicketService::new(SaveEventFaults {
        inner: inner.clone(),
    });

    let err = service
        .book_ticket(&UserId::new("u1"), &EventId::new("e1"), 5, Category::Bar)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::TransactionFailed(_)));
    assert!(err.is_transient());

    // The debit, the ticket, and both links were rolled back together.
    assert_eq!(balance_of(&inner, "u1").await, dec!(100));
    assert_eq!(inner.ticket_count().await, 0);
    assert!(!inner
        .ticket_exists(&EventId::new("e1"), 5, Category::Bar)
        .await
        .unwrap());
    let user = inner.find_user(&UserId::new("u1")).await.unwrap().unwrap();
    assert!(user.tickets.is_empty());
    let event = inner
        .find_event(&EventId::new("e1"))
        .await
        .unwrap()
        .unwrap();
    assert!(event.tickets.is_empty());
}
