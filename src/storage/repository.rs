use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use crate::domain::{
    Currency, Event, EventId, EventSnapshot, Expense, ExpenseId, NewExpense, Participant,
    ParticipantId,
};

use super::MIGRATION_001_INITIAL;

/// Write-side failures. Rejections are typed so callers can tell a user mistake
/// from a storage fault; the latter arrive as [`StoreError::Backend`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(ExpenseId),

    #[error("Participant '{name}' is referenced by {expenses} expense(s)")]
    ParticipantInUse {
        participant: ParticipantId,
        name: String,
        expenses: i64,
    },

    #[error("Payer {0} does not belong to this event")]
    ForeignPayer(ParticipantId),

    #[error("Beneficiary {0} does not belong to this event")]
    ForeignBeneficiary(ParticipantId),

    #[error("Expense has no beneficiaries")]
    NoBeneficiaries,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The ledger store: events, participants and expenses in SQLite.
///
/// Every mutation runs in a single transaction, and [`Repository::load_snapshot`]
/// reads an event in one transaction, so a reader never sees half of a write.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database. Foreign keys are always enforced.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Event operations
    // ========================

    /// Save a new event to the database.
    pub async fn save_event(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, name, currency, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(event.id.as_str())
        .bind(&event.name)
        .bind(event.currency.code())
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save event")?;
        tracing::debug!(event = %event.id, "saved event");
        Ok(())
    }

    /// Get an event by ID.
    pub async fn get_event(&self, id: &EventId) -> Result<Option<Event>> {
        let row = sqlx::query("SELECT id, name, currency, created_at FROM events WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch event")?;

        row.as_ref().map(Self::row_to_event).transpose()
    }

    /// Delete an event together with its participants and expenses.
    pub async fn delete_event(&self, id: &EventId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        if !Self::event_exists(&mut tx, id).await? {
            return Err(StoreError::EventNotFound(id.clone()));
        }

        sqlx::query(
            r#"
            DELETE FROM expense_beneficiaries
            WHERE expense_id IN (SELECT id FROM expenses WHERE event_id = ?)
            "#,
        )
        .bind(id.as_str())
        .execute(&mut *tx)
        .await
        .context("Failed to delete expense beneficiaries")?;

        for statement in [
            "DELETE FROM expenses WHERE event_id = ?",
            "DELETE FROM participants WHERE event_id = ?",
            "DELETE FROM events WHERE id = ?",
        ] {
            sqlx::query(statement)
                .bind(id.as_str())
                .execute(&mut *tx)
                .await
                .context("Failed to delete event")?;
        }

        tx.commit().await.context("Failed to commit event deletion")?;
        tracing::debug!(event = %id, "deleted event");
        Ok(())
    }

    async fn event_exists(conn: &mut SqliteConnection, id: &EventId) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM events WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&mut *conn)
            .await
            .context("Failed to check event")?;
        Ok(row.is_some())
    }

    fn row_to_event(row: &SqliteRow) -> Result<Event> {
        let id: String = row.get("id");
        let currency: String = row.get("currency");
        let created_at_str: String = row.get("created_at");

        Ok(Event {
            id: EventId::from(id),
            name: row.get("name"),
            currency: Currency::parse(&currency).context("Invalid event currency")?,
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Participant operations
    // ========================

    /// Add a participant to an event. The store assigns the id.
    pub async fn insert_participant(&self, event_id: &EventId, name: &str) -> StoreResult<Participant> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        if !Self::event_exists(&mut tx, event_id).await? {
            return Err(StoreError::EventNotFound(event_id.clone()));
        }

        let row = sqlx::query("INSERT INTO participants (event_id, name) VALUES (?, ?) RETURNING id")
            .bind(event_id.as_str())
            .bind(name)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to save participant")?;

        tx.commit().await.context("Failed to commit participant")?;

        Ok(Participant {
            id: row.get("id"),
            event_id: event_id.clone(),
            name: name.to_string(),
        })
    }

    /// Get a participant of an event by ID.
    pub async fn get_participant(
        &self,
        event_id: &EventId,
        id: ParticipantId,
    ) -> Result<Option<Participant>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        Self::fetch_participant(&mut conn, event_id, id).await
    }

    async fn fetch_participant(
        conn: &mut SqliteConnection,
        event_id: &EventId,
        id: ParticipantId,
    ) -> Result<Option<Participant>> {
        let row = sqlx::query("SELECT id, event_id, name FROM participants WHERE id = ? AND event_id = ?")
            .bind(id)
            .bind(event_id.as_str())
            .fetch_optional(&mut *conn)
            .await
            .context("Failed to fetch participant")?;

        Ok(row.as_ref().map(Self::row_to_participant))
    }

    /// Delete a participant, refusing while any expense still references them
    /// as payer or beneficiary. The check and the delete share one transaction.
    pub async fn delete_participant(
        &self,
        event_id: &EventId,
        id: ParticipantId,
    ) -> StoreResult<Participant> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let participant = Self::fetch_participant(&mut tx, event_id, id)
            .await?
            .ok_or(StoreError::ParticipantNotFound(id))?;

        let references: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM expenses e
            WHERE e.event_id = ?
              AND (e.paid_by = ?
                   OR EXISTS (SELECT 1 FROM expense_beneficiaries b
                              WHERE b.expense_id = e.id AND b.participant_id = ?))
            "#,
        )
        .bind(event_id.as_str())
        .bind(id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to count participant references")?
        .get("count");

        if references > 0 {
            return Err(StoreError::ParticipantInUse {
                participant: id,
                name: participant.name,
                expenses: references,
            });
        }

        sqlx::query("DELETE FROM participants WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete participant")?;

        tx.commit().await.context("Failed to commit participant deletion")?;
        Ok(participant)
    }

    fn row_to_participant(row: &SqliteRow) -> Participant {
        let event_id: String = row.get("event_id");
        Participant {
            id: row.get("id"),
            event_id: EventId::from(event_id),
            name: row.get("name"),
        }
    }

    // ========================
    // Expense operations
    // ========================

    /// Record an expense. Payer and beneficiaries must belong to the event; an
    /// empty beneficiary list is replaced by every participant the event has at
    /// this moment, and that list is stored as-is from then on.
    pub async fn insert_expense(&self, event_id: &EventId, new: &NewExpense) -> StoreResult<Expense> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        if !Self::event_exists(&mut tx, event_id).await? {
            return Err(StoreError::EventNotFound(event_id.clone()));
        }

        let members: Vec<ParticipantId> =
            sqlx::query("SELECT id FROM participants WHERE event_id = ? ORDER BY id")
                .bind(event_id.as_str())
                .fetch_all(&mut *tx)
                .await
                .context("Failed to list participants")?
                .iter()
                .map(|row| row.get("id"))
                .collect();

        if !members.contains(&new.paid_by) {
            return Err(StoreError::ForeignPayer(new.paid_by));
        }

        let mut beneficiaries = new.distinct_beneficiaries();
        if beneficiaries.is_empty() {
            beneficiaries = members.clone();
        }
        if let Some(stranger) = beneficiaries.iter().find(|id| !members.contains(id)) {
            return Err(StoreError::ForeignBeneficiary(*stranger));
        }
        if beneficiaries.is_empty() {
            return Err(StoreError::NoBeneficiaries);
        }
        // Keep stored order aligned with participant insertion order.
        beneficiaries.sort_unstable();

        let title = new.normalized_title();
        let created_at = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO expenses (event_id, title, amount, paid_by, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(event_id.as_str())
        .bind(&title)
        .bind(new.amount)
        .bind(new.paid_by)
        .bind(created_at.to_rfc3339())
        .fetch_one(&mut *tx)
        .await
        .context("Failed to save expense")?;
        let id: ExpenseId = row.get("id");

        for participant in &beneficiaries {
            sqlx::query("INSERT INTO expense_beneficiaries (expense_id, participant_id) VALUES (?, ?)")
                .bind(id)
                .bind(*participant)
                .execute(&mut *tx)
                .await
                .context("Failed to save expense beneficiary")?;
        }

        tx.commit().await.context("Failed to commit expense")?;

        Ok(Expense {
            id,
            event_id: event_id.clone(),
            title,
            amount: new.amount,
            paid_by: new.paid_by,
            beneficiaries,
            created_at,
        })
    }

    /// Get an expense of an event by ID, with its beneficiaries.
    pub async fn get_expense(&self, event_id: &EventId, id: ExpenseId) -> Result<Option<Expense>> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let row = sqlx::query(
            r#"
            SELECT id, event_id, title, amount, paid_by, created_at
            FROM expenses
            WHERE id = ? AND event_id = ?
            "#,
        )
        .bind(id)
        .bind(event_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch expense")?;
        let Some(row) = row else {
            return Ok(None);
        };

        let beneficiaries: Vec<ParticipantId> = sqlx::query(
            "SELECT participant_id FROM expense_beneficiaries WHERE expense_id = ? ORDER BY participant_id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to list expense beneficiaries")?
        .iter()
        .map(|row| row.get("participant_id"))
        .collect();

        tx.commit().await.context("Failed to close expense transaction")?;

        let created_at_str: String = row.get("created_at");
        Ok(Some(Expense {
            id,
            event_id: event_id.clone(),
            title: row.get("title"),
            amount: row.get("amount"),
            paid_by: row.get("paid_by"),
            beneficiaries,
            created_at: parse_timestamp(&created_at_str)?,
        }))
    }

    /// Delete an expense of an event.
    pub async fn delete_expense(&self, event_id: &EventId, id: ExpenseId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let found = sqlx::query("SELECT 1 FROM expenses WHERE id = ? AND event_id = ?")
            .bind(id)
            .bind(event_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch expense")?;
        if found.is_none() {
            return Err(StoreError::ExpenseNotFound(id));
        }

        sqlx::query("DELETE FROM expense_beneficiaries WHERE expense_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete expense beneficiaries")?;
        sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete expense")?;

        tx.commit().await.context("Failed to commit expense deletion")?;
        Ok(())
    }

    // ========================
    // Snapshot
    // ========================

    /// Read an event with all its participants and expenses in one transaction.
    /// Returns `None` if the event does not exist.
    pub async fn load_snapshot(&self, event_id: &EventId) -> Result<Option<EventSnapshot>> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let event_row = sqlx::query("SELECT id, name, currency, created_at FROM events WHERE id = ?")
            .bind(event_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch event")?;
        let event = match event_row {
            Some(row) => Self::row_to_event(&row)?,
            None => return Ok(None),
        };

        let participants: Vec<Participant> =
            sqlx::query("SELECT id, event_id, name FROM participants WHERE event_id = ? ORDER BY id")
                .bind(event_id.as_str())
                .fetch_all(&mut *tx)
                .await
                .context("Failed to list participants")?
                .iter()
                .map(Self::row_to_participant)
                .collect();

        let mut beneficiaries: HashMap<ExpenseId, Vec<ParticipantId>> = HashMap::new();
        let rows = sqlx::query(
            r#"
            SELECT b.expense_id, b.participant_id
            FROM expense_beneficiaries b
            JOIN expenses e ON e.id = b.expense_id
            WHERE e.event_id = ?
            ORDER BY b.expense_id, b.participant_id
            "#,
        )
        .bind(event_id.as_str())
        .fetch_all(&mut *tx)
        .await
        .context("Failed to list expense beneficiaries")?;
        for row in rows {
            beneficiaries
                .entry(row.get("expense_id"))
                .or_default()
                .push(row.get("participant_id"));
        }

        let expense_rows = sqlx::query(
            r#"
            SELECT id, event_id, title, amount, paid_by, created_at
            FROM expenses
            WHERE event_id = ?
            ORDER BY id
            "#,
        )
        .bind(event_id.as_str())
        .fetch_all(&mut *tx)
        .await
        .context("Failed to list expenses")?;

        let mut expenses = Vec::with_capacity(expense_rows.len());
        for row in &expense_rows {
            let id: ExpenseId = row.get("id");
            let created_at_str: String = row.get("created_at");
            expenses.push(Expense {
                id,
                event_id: event.id.clone(),
                title: row.get("title"),
                amount: row.get("amount"),
                paid_by: row.get("paid_by"),
                beneficiaries: beneficiaries.remove(&id).unwrap_or_default(),
                created_at: parse_timestamp(&created_at_str)?,
            });
        }

        tx.commit().await.context("Failed to close snapshot transaction")?;

        Ok(Some(EventSnapshot {
            event,
            participants,
            expenses,
        }))
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .context("Invalid timestamp")?
        .with_timezone(&Utc))
}
