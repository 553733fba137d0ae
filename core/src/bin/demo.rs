//! End-to-end booking demo against the in-memory ledger.
//!
//! Run with: `cargo run --bin demo`

use anyhow::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use ticket_booking_core::{
    Category, Event, EventId, InMemoryLedger, Ledger, PageRequest, TicketService, User, UserId,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let service = TicketService::new(InMemoryLedger::new());

    // Users and events come from outside the booking core; seed them
    // directly through the ledger.
    let user = User::new(
        UserId::new("u1"),
        "Alice",
        "alice@example.com",
        Decimal::new(10_000, 2),
    );
    service.ledger().save_user(&user).await?;

    let event = Event::new(
        EventId::new("e1"),
        "Rust Philharmonic",
        Utc::now(),
        Decimal::new(6_000, 2),
    );
    service.ledger().save_event(&event).await?;

    let ticket = service
        .book_ticket(&user.id, &event.id, 5, Category::Bar)
        .await?;
    info!(ticket_id = %ticket.id, "booked");

    // A second attempt at the same seat is refused.
    let conflict = service
        .book_ticket(&user.id, &event.id, 5, Category::Bar)
        .await;
    info!(?conflict, "second attempt at the same seat");

    let page = service
        .booked_tickets_by_user(&user.id, PageRequest::new(1, 10))
        .await?;
    info!(count = page.len(), "tickets on page 1");

    let cancelled = service.cancel_ticket(&ticket.id).await;
    info!(cancelled, "cancellation outcome");

    let balance = service
        .ledger()
        .find_user(&user.id)
        .await?
        .map(|u| u.balance);
    info!(?balance, "final balance (cancellation does not refund)");

    Ok(())
}
