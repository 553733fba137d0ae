//! Error taxonomy for store, booking, and query operations.

use crate::types::{Category, EventId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias for ledger store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures reported by a ledger store implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("record not found")]
    NotFound,

    /// A conditional insert lost to an existing record.
    ///
    /// For tickets this is the seat-uniqueness constraint on
    /// `(event_id, place, category)`: a racing second insert surfaces here
    /// instead of silently duplicating the seat.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The storage backend failed (I/O, connection, commit, timeout).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failures of the booking transaction.
///
/// Each variant names the specific reason the booking did not happen so the
/// caller can render distinct messages; in every case no partial state is
/// left behind.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BookingError {
    /// The buyer does not exist.
    #[error("user {0} does not exist")]
    UserNotFound(UserId),

    /// The event does not exist.
    #[error("event {0} does not exist")]
    EventNotFound(EventId),

    /// The seat is already booked for this event and category.
    #[error("place {place} in category {category} is already booked for event {event_id}")]
    SeatTaken {
        /// Event the seat belongs to.
        event_id: EventId,
        /// Requested seat number.
        place: u32,
        /// Requested seating category.
        category: Category,
    },

    /// The buyer's balance does not cover the ticket price.
    #[error("user {user_id} has insufficient funds: balance {balance}, ticket price {price}")]
    InsufficientFunds {
        /// The buyer.
        user_id: UserId,
        /// Balance at the time of the check.
        balance: Decimal,
        /// Price of a ticket for the event.
        price: Decimal,
    },

    /// The store failed while the transaction was in flight; everything was
    /// rolled back. Not retried internally; retry policy belongs to the
    /// caller.
    #[error("booking transaction failed: {0}")]
    TransactionFailed(#[from] StoreError),
}

impl BookingError {
    /// Returns `true` if the booking was refused by a business rule or a
    /// missing record, i.e. retrying the identical request cannot succeed
    /// without a state change.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        !matches!(self, Self::TransactionFailed(_))
    }

    /// Returns `true` for store-level failures where a retry may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransactionFailed(_))
    }
}

/// Failures of the paginated ticket queries.
///
/// An empty page is *not* an error: absent ids and zero matches produce
/// `Ok` with an empty page, while a store failure is reported as
/// [`QueryError::Store`] so callers can tell "no data" from "query failed".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The page request is malformed (page number or size of zero).
    #[error("invalid page request: {0}")]
    InvalidPageRequest(String),

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
