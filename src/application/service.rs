use crate::domain::{
    normalize_name, Currency, Event, EventId, EventSnapshot, Expense, ExpenseId, NewExpense,
    Participant, ParticipantId, DEFAULT_CURRENCY, MAX_AMOUNT,
};
use crate::storage::Repository;

use super::{settle_snapshot, AppError, EventLocks, Settlement};

/// Application service providing the operations clients use on shared events.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
///
/// Writes and settlement reads of one event are serialized through a per-event
/// lock; operations on different events proceed independently.
pub struct SplitService {
    repo: Repository,
    locks: EventLocks,
}

impl SplitService {
    /// Create a new service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            locks: EventLocks::new(),
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Event operations
    // ========================

    /// Create a new event. A blank name and a missing currency fall back to defaults.
    pub async fn create_event(&self, name: &str, currency: Option<&str>) -> Result<Event, AppError> {
        let code = currency.unwrap_or(DEFAULT_CURRENCY);
        let currency =
            Currency::parse(code).map_err(|e| AppError::InvalidCurrency(e.to_string()))?;

        let event = Event::new(name, currency);
        self.repo.save_event(&event).await?;
        tracing::info!(event = %event.id, name = %event.name, "created event");
        Ok(event)
    }

    /// Get an event by ID.
    pub async fn get_event(&self, id: &EventId) -> Result<Event, AppError> {
        self.repo
            .get_event(id)
            .await?
            .ok_or_else(|| AppError::EventNotFound(id.to_string()))
    }

    /// Get an event with its participants and expenses.
    pub async fn get_snapshot(&self, id: &EventId) -> Result<EventSnapshot, AppError> {
        let _guard = self.locks.lock(id).await;
        self.repo
            .load_snapshot(id)
            .await?
            .ok_or_else(|| AppError::EventNotFound(id.to_string()))
    }

    /// Delete an event with everything in it.
    pub async fn delete_event(&self, id: &EventId) -> Result<Event, AppError> {
        let guard = self.locks.lock(id).await;
        let event = self.get_event(id).await?;
        self.repo.delete_event(id).await?;
        self.locks.forget(id);
        drop(guard);

        tracing::info!(event = %id, "deleted event");
        Ok(event)
    }

    // ========================
    // Participant operations
    // ========================

    /// Add a participant to an event.
    pub async fn add_participant(
        &self,
        event_id: &EventId,
        name: &str,
    ) -> Result<Participant, AppError> {
        let name = normalize_name(name)
            .ok_or_else(|| AppError::InvalidName("participant name is required".to_string()))?;

        let _guard = self.locks.lock(event_id).await;
        let participant = self.repo.insert_participant(event_id, &name).await?;
        tracing::debug!(event = %event_id, participant = participant.id, "added participant");
        Ok(participant)
    }

    /// Remove a participant. Fails with [`AppError::ParticipantInUse`] while any
    /// expense names them as payer or beneficiary.
    pub async fn remove_participant(
        &self,
        event_id: &EventId,
        participant: ParticipantId,
    ) -> Result<Participant, AppError> {
        let _guard = self.locks.lock(event_id).await;
        self.ensure_event(event_id).await?;
        let removed = self.repo.delete_participant(event_id, participant).await?;
        tracing::debug!(event = %event_id, participant, "removed participant");
        Ok(removed)
    }

    // ========================
    // Expense operations
    // ========================

    /// Record an expense. With no beneficiaries given, everyone currently in the
    /// event is a beneficiary.
    pub async fn add_expense(
        &self,
        event_id: &EventId,
        expense: NewExpense,
    ) -> Result<Expense, AppError> {
        if expense.amount <= 0 {
            return Err(AppError::InvalidAmount("Amount must be positive".to_string()));
        }
        if expense.amount > MAX_AMOUNT {
            return Err(AppError::InvalidAmount(format!(
                "Amount must not exceed {} minor units",
                MAX_AMOUNT
            )));
        }

        let _guard = self.locks.lock(event_id).await;
        let expense = self.repo.insert_expense(event_id, &expense).await?;
        tracing::debug!(
            event = %event_id,
            expense = expense.id,
            amount = expense.amount,
            beneficiaries = expense.beneficiaries.len(),
            "added expense"
        );
        Ok(expense)
    }

    /// Remove an expense.
    pub async fn remove_expense(&self, event_id: &EventId, expense: ExpenseId) -> Result<(), AppError> {
        let _guard = self.locks.lock(event_id).await;
        self.ensure_event(event_id).await?;
        self.repo.delete_expense(event_id, expense).await?;
        tracing::debug!(event = %event_id, expense, "removed expense");
        Ok(())
    }

    // ========================
    // Settlement
    // ========================

    /// Compute balances and the transfer plan for an event.
    ///
    /// A snapshot that fails the engine's checks is an internal fault: it is
    /// logged with full detail and reported as [`AppError::Inconsistent`].
    pub async fn settle(&self, event_id: &EventId) -> Result<Settlement, AppError> {
        let (_, settlement) = self.snapshot_with_settlement(event_id).await?;
        Ok(settlement)
    }

    /// Like [`SplitService::settle`], also returning the snapshot the
    /// settlement was computed from.
    pub async fn snapshot_with_settlement(
        &self,
        event_id: &EventId,
    ) -> Result<(EventSnapshot, Settlement), AppError> {
        let snapshot = self.get_snapshot(event_id).await?;

        let settlement = settle_snapshot(&snapshot).map_err(|err| {
            tracing::error!(event = %event_id, error = %err, "settlement rejected stored data");
            AppError::Inconsistent(err)
        })?;
        Ok((snapshot, settlement))
    }

    async fn ensure_event(&self, event_id: &EventId) -> Result<(), AppError> {
        self.get_event(event_id).await.map(|_| ())
    }
}
