//! # Ticket Booking Core
//!
//! Transactional core of a seat-booking system: users reserve a seat at an
//! event and pay for it from a prepaid balance, with the guarantee that no
//! seat/category combination is ever sold twice and that a balance is only
//! debited when a ticket is actually granted.
//!
//! ## Components
//!
//! - [`TicketService`]: the booking transaction engine (validate, debit,
//!   create, link, all or nothing), the cancellation engine, and the
//!   paginated query facade.
//! - [`Ledger`] / [`LedgerTransaction`]: the store abstraction the engine
//!   runs against: point lookups, conditional existence checks, upserts, and
//!   a unit-of-work with commit/rollback and an atomic conditional ticket
//!   insert.
//! - [`InMemoryLedger`]: in-memory store, used as the test double and for
//!   demos; the PostgreSQL store lives in the `ticket-booking-postgres`
//!   crate.
//!
//! ## Example
//!
//! ```
//! use rust_decimal::Decimal;
//! use ticket_booking_core::{
//!     Category, Event, EventId, InMemoryLedger, Ledger, TicketService, User, UserId,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = TicketService::new(InMemoryLedger::new());
//!
//! // Users and events are created outside the booking core.
//! let user = User::new(UserId::new("u1"), "Alice", "alice@example.com", Decimal::new(10_000, 2));
//! service.ledger().save_user(&user).await?;
//! let event = Event::new(EventId::new("e1"), "Concert", chrono::Utc::now(), Decimal::new(6_000, 2));
//! service.ledger().save_event(&event).await?;
//!
//! let ticket = service
//!     .book_ticket(&user.id, &event.id, 5, Category::Bar)
//!     .await?;
//! assert_eq!(ticket.place, 5);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod ledger;
pub mod memory;
pub mod service;
pub mod types;

pub use error::{BookingError, QueryError, StoreError, StoreResult};
pub use ledger::{Ledger, LedgerTransaction};
pub use memory::{InMemoryLedger, InMemoryTransaction};
pub use service::TicketService;
pub use types::{
    Category, Event, EventId, Page, PageRequest, Ticket, TicketId, User, UserId,
};
