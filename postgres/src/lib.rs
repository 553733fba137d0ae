//! # Ticket Booking Postgres
//!
//! PostgreSQL-backed [`Ledger`] for the ticket booking core.
//!
//! Users and events are stored as JSONB documents keyed by their opaque ids;
//! tickets get relational columns so the seat constraint, a unique index on
//! `(event_id, place, category)`, and the paging queries can be indexed.
//! A [`Ledger::begin`] maps to a SQL transaction, so the booking engine's
//! read-check-then-write sequence runs under the database's isolation and a
//! lost seat race surfaces as a unique violation instead of a double sell.
//!
//! # Example
//!
//! ```no_run
//! use ticket_booking_core::TicketService;
//! use ticket_booking_postgres::{PostgresConfig, PostgresLedger};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = PostgresLedger::connect(&PostgresConfig::from_env()).await?;
//! ledger.migrate().await?;
//! let service = TicketService::new(ledger);
//! # Ok(())
//! # }
//! ```

pub mod config;

pub use config::PostgresConfig;

use sqlx::postgres::PgPoolOptions;
use sqlx::types::JsonValue;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use std::time::Duration;
use ticket_booking_core::{
    Category, Event, EventId, Ledger, LedgerTransaction, Page, PageRequest, StoreError,
    StoreResult, Ticket, TicketId, User, UserId,
};
use tracing::info;

/// PostgreSQL-backed [`Ledger`] over a connection pool.
///
/// Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Wraps an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool per the given configuration.
    ///
    /// Every pooled connection gets the configured statement timeout, so no
    /// store call can block unboundedly; a timed-out call surfaces as a
    /// backend error like any other store failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub async fn connect(config: &PostgresConfig) -> StoreResult<Self> {
        let statement_timeout = config.statement_timeout;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    let stmt = format!("SET statement_timeout = '{statement_timeout}s'");
                    sqlx::query(&stmt).execute(conn).await?;
                    Ok(())
                })
            })
            .connect(&config.url)
            .await
            .map_err(store_error)?;
        info!(url = %config.url, "connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Runs the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Ledger for PostgresLedger {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> StoreResult<PostgresTransaction> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(PostgresTransaction { tx })
    }

    async fn user_exists(&self, id: &UserId) -> StoreResult<bool> {
        exists_user(&self.pool, id).await
    }

    async fn find_user(&self, id: &UserId) -> StoreResult<Option<User>> {
        fetch_user(&self.pool, id).await
    }

    async fn save_user(&self, user: &User) -> StoreResult<User> {
        upsert_user(&self.pool, user).await
    }

    async fn event_exists(&self, id: &EventId) -> StoreResult<bool> {
        exists_event(&self.pool, id).await
    }

    async fn find_event(&self, id: &EventId) -> StoreResult<Option<Event>> {
        fetch_event(&self.pool, id).await
    }

    async fn save_event(&self, event: &Event) -> StoreResult<Event> {
        upsert_event(&self.pool, event).await
    }

    async fn ticket_exists(
        &self,
        event_id: &EventId,
        place: u32,
        category: Category,
    ) -> StoreResult<bool> {
        exists_ticket(&self.pool, event_id, place, category).await
    }

    async fn delete_ticket(&self, id: &TicketId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn tickets_by_user(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> StoreResult<Page<Ticket>> {
        let rows: Vec<(JsonValue,)> = sqlx::query_as(
            "SELECT data FROM tickets WHERE user_id = $1 \
             ORDER BY created_at, id LIMIT $2 OFFSET $3",
        )
        .bind(user_id.as_str())
        .bind(limit(page))
        .bind(offset(page))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        decode_ticket_page(rows, page)
    }

    async fn tickets_by_event(
        &self,
        event_id: &EventId,
        page: PageRequest,
    ) -> StoreResult<Page<Ticket>> {
        let rows: Vec<(JsonValue,)> = sqlx::query_as(
            "SELECT data FROM tickets WHERE event_id = $1 \
             ORDER BY created_at, id LIMIT $2 OFFSET $3",
        )
        .bind(event_id.as_str())
        .bind(limit(page))
        .bind(offset(page))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        decode_ticket_page(rows, page)
    }
}

/// A SQL transaction implementing the booking unit of work.
///
/// Dropping it without a commit rolls the SQL transaction back.
#[derive(Debug)]
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

impl LedgerTransaction for PostgresTransaction {
    async fn user_exists(&mut self, id: &UserId) -> StoreResult<bool> {
        exists_user(&mut *self.tx, id).await
    }

    async fn event_exists(&mut self, id: &EventId) -> StoreResult<bool> {
        exists_event(&mut *self.tx, id).await
    }

    async fn ticket_exists(
        &mut self,
        event_id: &EventId,
        place: u32,
        category: Category,
    ) -> StoreResult<bool> {
        exists_ticket(&mut *self.tx, event_id, place, category).await
    }

    async fn find_user(&mut self, id: &UserId) -> StoreResult<Option<User>> {
        fetch_user(&mut *self.tx, id).await
    }

    async fn find_event(&mut self, id: &EventId) -> StoreResult<Option<Event>> {
        fetch_event(&mut *self.tx, id).await
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<User> {
        upsert_user(&mut *self.tx, user).await
    }

    async fn save_event(&mut self, event: &Event) -> StoreResult<Event> {
        upsert_event(&mut *self.tx, event).await
    }

    async fn insert_ticket(&mut self, ticket: &Ticket) -> StoreResult<Ticket> {
        let data = to_json(ticket, "ticket")?;
        sqlx::query(
            "INSERT INTO tickets (id, user_id, event_id, place, category, data) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(ticket.id.as_str())
        .bind(ticket.user_id.as_str())
        .bind(ticket.event_id.as_str())
        .bind(i64::from(ticket.place))
        .bind(ticket.category.to_string())
        .bind(data)
        .execute(&mut *self.tx)
        .await
        .map_err(store_error)?;
        Ok(ticket.clone())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await.map_err(store_error)
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await.map_err(store_error)
    }
}

fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::UniqueViolation(db.message().to_string())
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::Backend(err.to_string()),
    }
}

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> StoreResult<JsonValue> {
    serde_json::to_value(value)
        .map_err(|e| StoreError::Backend(format!("failed to serialize {what}: {e}")))
}

fn from_json<T: serde::de::DeserializeOwned>(value: JsonValue, what: &str) -> StoreResult<T> {
    serde_json::from_value(value)
        .map_err(|e| StoreError::Backend(format!("failed to deserialize {what}: {e}")))
}

fn limit(page: PageRequest) -> i64 {
    i64::from(page.size())
}

fn offset(page: PageRequest) -> i64 {
    i64::try_from(page.offset()).unwrap_or(i64::MAX)
}

fn decode_ticket_page(rows: Vec<(JsonValue,)>, page: PageRequest) -> StoreResult<Page<Ticket>> {
    let items = rows
        .into_iter()
        .map(|(json,)| from_json(json, "ticket"))
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(Page::new(items, page))
}

async fn exists_user<'e, E: PgExecutor<'e>>(executor: E, id: &UserId) -> StoreResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(id.as_str())
        .fetch_one(executor)
        .await
        .map_err(store_error)?;
    Ok(exists)
}

async fn exists_event<'e, E: PgExecutor<'e>>(executor: E, id: &EventId) -> StoreResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
        .bind(id.as_str())
        .fetch_one(executor)
        .await
        .map_err(store_error)?;
    Ok(exists)
}

async fn exists_ticket<'e, E: PgExecutor<'e>>(
    executor: E,
    event_id: &EventId,
    place: u32,
    category: Category,
) -> StoreResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM tickets \
         WHERE event_id = $1 AND place = $2 AND category = $3)",
    )
    .bind(event_id.as_str())
    .bind(i64::from(place))
    .bind(category.to_string())
    .fetch_one(executor)
    .await
    .map_err(store_error)?;
    Ok(exists)
}

async fn fetch_user<'e, E: PgExecutor<'e>>(executor: E, id: &UserId) -> StoreResult<Option<User>> {
    let row: Option<(JsonValue,)> = sqlx::query_as("SELECT data FROM users WHERE id = $1")
        .bind(id.as_str())
        .fetch_optional(executor)
        .await
        .map_err(store_error)?;
    row.map(|(json,)| from_json(json, "user")).transpose()
}

async fn fetch_event<'e, E: PgExecutor<'e>>(
    executor: E,
    id: &EventId,
) -> StoreResult<Option<Event>> {
    let row: Option<(JsonValue,)> = sqlx::query_as("SELECT data FROM events WHERE id = $1")
        .bind(id.as_str())
        .fetch_optional(executor)
        .await
        .map_err(store_error)?;
    row.map(|(json,)| from_json(json, "event")).transpose()
}

async fn upsert_user<'e, E: PgExecutor<'e>>(executor: E, user: &User) -> StoreResult<User> {
    let data = to_json(user, "user")?;
    sqlx::query(
        "INSERT INTO users (id, data) VALUES ($1, $2) \
         ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
    )
    .bind(user.id.as_str())
    .bind(data)
    .execute(executor)
    .await
    .map_err(store_error)?;
    Ok(user.clone())
}

async fn upsert_event<'e, E: PgExecutor<'e>>(executor: E, event: &Event) -> StoreResult<Event> {
    let data = to_json(event, "event")?;
    sqlx::query(
        "INSERT INTO events (id, data) VALUES ($1, $2) \
         ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
    )
    .bind(event.id.as_str())
    .bind(data)
    .execute(executor)
    .await
    .map_err(store_error)?;
    Ok(event.clone())
}
