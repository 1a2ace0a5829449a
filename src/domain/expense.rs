use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EventId, MinorUnits, ParticipantId};

pub type ExpenseId = i64;

/// Title given to expenses recorded with a blank title.
pub const DEFAULT_EXPENSE_TITLE: &str = "Expense";

/// A payment made by one participant on behalf of a set of beneficiaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub event_id: EventId,
    pub title: String,
    /// Amount in minor units (always positive)
    pub amount: MinorUnits,
    pub paid_by: ParticipantId,
    /// Who the money was spent on. Resolved once when the expense is recorded.
    pub beneficiaries: Vec<ParticipantId>,
    pub created_at: DateTime<Utc>,
}

/// Write-side request for a new expense. An empty `beneficiaries` list means
/// "everyone currently in the event".
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub title: String,
    pub amount: MinorUnits,
    pub paid_by: ParticipantId,
    pub beneficiaries: Vec<ParticipantId>,
}

impl NewExpense {
    pub fn new(title: impl Into<String>, amount: MinorUnits, paid_by: ParticipantId) -> Self {
        Self {
            title: title.into(),
            amount,
            paid_by,
            beneficiaries: Vec::new(),
        }
    }

    pub fn with_beneficiaries(mut self, beneficiaries: Vec<ParticipantId>) -> Self {
        self.beneficiaries = beneficiaries;
        self
    }

    /// Title with surrounding whitespace removed, falling back to the default.
    pub fn normalized_title(&self) -> String {
        let title = self.title.trim();
        if title.is_empty() {
            DEFAULT_EXPENSE_TITLE.to_string()
        } else {
            title.to_string()
        }
    }

    /// Beneficiaries with duplicates dropped, first occurrence kept.
    pub fn distinct_beneficiaries(&self) -> Vec<ParticipantId> {
        let mut seen = Vec::with_capacity(self.beneficiaries.len());
        for id in &self.beneficiaries {
            if !seen.contains(id) {
                seen.push(*id);
            }
        }
        seen
    }
}
