//! Booking, cancellation, and ticket queries.
//!
//! [`TicketService`] is the transactional core of the system: a seat is
//! never sold twice, and a balance is only debited when a ticket is actually
//! granted.

use crate::error::{BookingError, QueryError, StoreError};
use crate::ledger::{Ledger, LedgerTransaction};
use crate::types::{Category, EventId, Page, PageRequest, Ticket, TicketId, UserId};
use tracing::{info, warn};

/// Booking transaction engine, cancellation engine, and query facade over a
/// [`Ledger`].
#[derive(Clone, Debug)]
pub struct TicketService<L> {
    ledger: L,
}

impl<L: Ledger> TicketService<L> {
    /// Creates a service over the given ledger.
    pub const fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// The underlying ledger.
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Books a seat at an event, paying from the user's prepaid balance.
    ///
    /// Runs as a single unit of work: validates that the user and event
    /// exist, that the seat `(event, place, category)` is free, and that the
    /// balance covers the ticket price; then debits the balance, creates the
    /// ticket, and links it into both the user's and the event's ticket
    /// lists. Either every one of those writes commits, or none do.
    ///
    /// Two callers racing for the same seat cannot both succeed: the ticket
    /// insert is conditional on the seat triple, and the loser gets
    /// [`BookingError::SeatTaken`].
    ///
    /// # Errors
    ///
    /// - [`BookingError::UserNotFound`] / [`BookingError::EventNotFound`] if
    ///   a referenced record is absent;
    /// - [`BookingError::SeatTaken`] if the seat is already booked;
    /// - [`BookingError::InsufficientFunds`] if the balance is below the
    ///   ticket price (an exactly equal balance is sufficient);
    /// - [`BookingError::TransactionFailed`] if the store fails mid-flight;
    ///   the transaction is rolled back and nothing is retried here.
    pub async fn book_ticket(
        &self,
        user_id: &UserId,
        event_id: &EventId,
        place: u32,
        category: Category,
    ) -> Result<Ticket, BookingError> {
        info!(%user_id, %event_id, place, %category, "booking a ticket");

        let mut tx = self.ledger.begin().await.map_err(BookingError::from)?;
        match Self::process_booking(&mut tx, user_id, event_id, place, category).await {
            Ok(ticket) => {
                tx.commit().await.map_err(BookingError::from)?;
                info!(%user_id, %event_id, ticket_id = %ticket.id, "ticket booked");
                Ok(ticket)
            }
            Err(err) => {
                warn!(%user_id, %event_id, place, %category, error = %err, "booking failed, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn process_booking(
        tx: &mut L::Tx,
        user_id: &UserId,
        event_id: &EventId,
        place: u32,
        category: Category,
    ) -> Result<Ticket, BookingError> {
        // Preconditions, checked in order; no mutation happens before all
        // pass.
        if !tx.user_exists(user_id).await? {
            return Err(BookingError::UserNotFound(user_id.clone()));
        }
        if !tx.event_exists(event_id).await? {
            return Err(BookingError::EventNotFound(event_id.clone()));
        }
        if tx.ticket_exists(event_id, place, category).await? {
            return Err(BookingError::SeatTaken {
                event_id: event_id.clone(),
                place,
                category,
            });
        }

        let mut user = tx
            .find_user(user_id)
            .await?
            .ok_or_else(|| BookingError::UserNotFound(user_id.clone()))?;
        let mut event = tx
            .find_event(event_id)
            .await?
            .ok_or_else(|| BookingError::EventNotFound(event_id.clone()))?;

        if user.balance < event.ticket_price {
            return Err(BookingError::InsufficientFunds {
                user_id: user_id.clone(),
                balance: user.balance,
                price: event.ticket_price,
            });
        }

        // Atomic mutation phase: debit, create, link to user, link to event.
        user.balance -= event.ticket_price;

        let ticket = Ticket::new(
            TicketId::generate(),
            user_id.clone(),
            event_id.clone(),
            place,
            category,
        );
        // The insert is conditional on the seat triple; losing a race here
        // surfaces as a unique violation, which is a seat conflict, not a
        // store failure.
        let ticket = match tx.insert_ticket(&ticket).await {
            Ok(ticket) => ticket,
            Err(StoreError::UniqueViolation(_)) => {
                return Err(BookingError::SeatTaken {
                    event_id: event_id.clone(),
                    place,
                    category,
                });
            }
            Err(err) => return Err(err.into()),
        };

        user.tickets.push(ticket.id.clone());
        tx.save_user(&user).await?;

        event.tickets.push(ticket.clone());
        tx.save_event(&event).await?;

        Ok(ticket)
    }

    /// Cancels a ticket by removing its record from the ledger.
    ///
    /// Returns `true` if the removal succeeded and `false` otherwise (a
    /// missing ticket, a store fault, anything); failures are logged, never
    /// raised. The user's balance is not refunded and the ticket id stays in
    /// the `User`/`Event` back-reference lists (the ticket records
    /// themselves are the authority on which tickets are live).
    pub async fn cancel_ticket(&self, ticket_id: &TicketId) -> bool {
        info!(%ticket_id, "cancelling a ticket");
        match self.ledger.delete_ticket(ticket_id).await {
            Ok(()) => {
                info!(%ticket_id, "ticket cancelled");
                true
            }
            Err(err) => {
                warn!(%ticket_id, error = %err, "cannot cancel ticket");
                false
            }
        }
    }

    /// Pages through the tickets booked by a user.
    ///
    /// An unknown user or a page past the end yields an empty page; only a
    /// store failure is an error.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidPageRequest`] for a zero page number or
    /// size, or [`QueryError::Store`] if the underlying query fails.
    pub async fn booked_tickets_by_user(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> Result<Page<Ticket>, QueryError> {
        info!(%user_id, page = page.page(), size = page.size(), "listing booked tickets by user");
        page.validate()?;
        self.ledger.tickets_by_user(user_id, page).await.map_err(|err| {
            warn!(%user_id, error = %err, "cannot list booked tickets by user");
            err.into()
        })
    }

    /// Pages through the tickets sold for an event.
    ///
    /// Same contract as [`booked_tickets_by_user`](Self::booked_tickets_by_user),
    /// keyed by event.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidPageRequest`] for a zero page number or
    /// size, or [`QueryError::Store`] if the underlying query fails.
    pub async fn booked_tickets_by_event(
        &self,
        event_id: &EventId,
        page: PageRequest,
    ) -> Result<Page<Ticket>, QueryError> {
        info!(%event_id, page = page.page(), size = page.size(), "listing booked tickets by event");
        page.validate()?;
        self.ledger.tickets_by_event(event_id, page).await.map_err(|err| {
            warn!(%event_id, error = %err, "cannot list booked tickets by event");
            err.into()
        })
    }
}
