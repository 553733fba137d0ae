//! Domain types for the ticket booking system.
//!
//! Users hold a prepaid balance and a list of owned ticket ids; events carry
//! a fixed ticket price and the tickets sold for them. Tickets are identified
//! by id but made unique by their `(event, place, category)` seat triple.

use crate::error::QueryError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user.
///
/// Opaque string: callers may use UUIDs, database ids, or anything else.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Creates a `UserId` from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an event.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
    /// Creates an `EventId` from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ticket.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(String);

impl TicketId {
    /// Creates a `TicketId` from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random ticket id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Seating category of a ticket.
///
/// Closed set; the price is per event, not per category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Standard seating.
    Economy,
    /// Bar seating.
    Bar,
    /// Premium seating.
    Premium,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Economy => write!(f, "ECONOMY"),
            Self::Bar => write!(f, "BAR"),
            Self::Premium => write!(f, "PREMIUM"),
        }
    }
}

/// A user with a prepaid account balance.
///
/// Users are created externally (via the ledger); the booking engine only
/// debits the balance and appends ticket ids, both inside the booking
/// transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Prepaid balance the booking engine debits from.
    pub balance: Decimal,
    /// Ids of tickets owned by this user. Back-reference only: the ledger's
    /// ticket records are the authority on which tickets are live.
    pub tickets: Vec<TicketId>,
}

impl User {
    /// Creates a user with no tickets.
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>, balance: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            balance,
            tickets: Vec::new(),
        }
    }
}

/// An event tickets are sold for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Event title.
    pub title: String,
    /// When the event takes place.
    pub date: DateTime<Utc>,
    /// Price of a ticket; fixed per event, shared by all categories.
    pub ticket_price: Decimal,
    /// Tickets sold for this event. Back-reference only, like
    /// [`User::tickets`].
    pub tickets: Vec<Ticket>,
}

impl Event {
    /// Creates an event with no tickets sold.
    pub fn new(
        id: EventId,
        title: impl Into<String>,
        date: DateTime<Utc>,
        ticket_price: Decimal,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            date,
            ticket_price,
            tickets: Vec::new(),
        }
    }
}

/// A sold seat.
///
/// Created only by the booking engine, removed only by cancellation,
/// otherwise immutable. No two live tickets share the same
/// `(event_id, place, category)` triple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier.
    pub id: TicketId,
    /// Owning user.
    pub user_id: UserId,
    /// Event the seat belongs to.
    pub event_id: EventId,
    /// Seat number within the category.
    pub place: u32,
    /// Seating category.
    pub category: Category,
}

impl Ticket {
    /// Creates a ticket record.
    #[must_use]
    pub const fn new(
        id: TicketId,
        user_id: UserId,
        event_id: EventId,
        place: u32,
        category: Category,
    ) -> Self {
        Self {
            id,
            user_id,
            event_id,
            place,
            category,
        }
    }

    /// Returns `true` if this ticket occupies the given seat triple.
    #[must_use]
    pub fn occupies(&self, event_id: &EventId, place: u32, category: Category) -> bool {
        self.event_id == *event_id && self.place == place && self.category == category
    }
}

/// A bounded slice of an ordered result set.
///
/// Pages are 1-indexed for callers and converted to a 0-indexed offset
/// internally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Creates a page request. `page` is 1-indexed.
    #[must_use]
    pub const fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    /// The 1-indexed page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Number of items per page.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Number of items to skip before this page starts.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.size as u64
    }

    /// Rejects page numbers below 1 and empty page sizes.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidPageRequest`] if `page == 0` or
    /// `size == 0`.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.page == 0 {
            return Err(QueryError::InvalidPageRequest(
                "page number is 1-indexed and must be >= 1".to_string(),
            ));
        }
        if self.size == 0 {
            return Err(QueryError::InvalidPageRequest(
                "page size must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One page of an ordered result set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page, in the store's stable order.
    pub items: Vec<T>,
    /// The request that produced this page.
    pub request: PageRequest,
}

impl<T> Page<T> {
    /// Creates a page from its items and the originating request.
    #[must_use]
    pub const fn new(items: Vec<T>, request: PageRequest) -> Self {
        Self { items, request }
    }

    /// An empty page for the given request.
    #[must_use]
    pub const fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            request,
        }
    }

    /// Number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if this page holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn category_display_matches_wire_format() {
        assert_eq!(Category::Economy.to_string(), "ECONOMY");
        assert_eq!(Category::Bar.to_string(), "BAR");
        assert_eq!(Category::Premium.to_string(), "PREMIUM");
    }

    #[test]
    fn category_serde_round_trip() {
        let json = serde_json::to_string(&Category::Premium).unwrap();
        assert_eq!(json, "\"PREMIUM\"");
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Category::Premium);
    }

    #[test]
    fn page_request_offset_is_zero_indexed() {
        assert_eq!(PageRequest::new(1, 10).offset(), 0);
        assert_eq!(PageRequest::new(2, 10).offset(), 10);
        assert_eq!(PageRequest::new(3, 7).offset(), 14);
    }

    #[test]
    fn page_request_rejects_zero_page_and_size() {
        assert!(PageRequest::new(0, 10).validate().is_err());
        assert!(PageRequest::new(1, 0).validate().is_err());
        assert!(PageRequest::new(1, 1).validate().is_ok());
    }

    #[test]
    fn ticket_occupies_its_seat_triple() {
        let event_id = EventId::new("e1");
        let ticket = Ticket::new(
            TicketId::generate(),
            UserId::new("u1"),
            event_id.clone(),
            5,
            Category::Bar,
        );
        assert!(ticket.occupies(&event_id, 5, Category::Bar));
        assert!(!ticket.occupies(&event_id, 5, Category::Premium));
        assert!(!ticket.occupies(&event_id, 6, Category::Bar));
        assert!(!ticket.occupies(&EventId::new("e2"), 5, Category::Bar));
    }
}
