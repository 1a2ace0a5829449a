use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::money::saturate;
use super::{Expense, MinorUnits, Participant, ParticipantId, SettlementError};

/// Net position of one participant. Positive = is owed money, negative = owes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantBalance {
    pub participant: ParticipantId,
    pub balance: MinorUnits,
}

/// Split `amount` into `parts` shares that sum exactly to `amount`.
/// The remainder goes one unit at a time to the leading shares, so shares never
/// differ by more than one minor unit.
/// Example: split_amount(1001, 2) -> [501, 500]
pub fn split_amount(amount: MinorUnits, parts: usize) -> Vec<MinorUnits> {
    if parts == 0 {
        return Vec::new();
    }
    let n = parts as i64;
    let base = amount / n;
    let remainder = amount % n;
    (0..n)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Reduce an event's expenses into one net balance per participant.
///
/// The result follows participant insertion order. Each expense credits the payer
/// with every beneficiary share and debits each beneficiary with its own share;
/// beneficiaries are taken in participant insertion order when the remainder is
/// handed out, whatever order the expense lists them in.
///
/// Every expense is re-validated against the participant set, and the balances
/// must sum to exactly zero before anything is returned.
pub fn compute_balances(
    participants: &[Participant],
    expenses: &[Expense],
) -> Result<Vec<ParticipantBalance>, SettlementError> {
    let positions: HashMap<ParticipantId, usize> = participants
        .iter()
        .enumerate()
        .map(|(position, p)| (p.id, position))
        .collect();

    let mut balances: Vec<MinorUnits> = vec![0; participants.len()];

    for expense in expenses {
        let invalid = |reason: String| SettlementError::InvalidExpense {
            expense: expense.id,
            reason,
        };

        if expense.amount <= 0 {
            return Err(invalid(format!("amount {} is not positive", expense.amount)));
        }
        let payer = *positions
            .get(&expense.paid_by)
            .ok_or_else(|| invalid(format!("payer {} is not in the event", expense.paid_by)))?;
        if expense.beneficiaries.is_empty() {
            return Err(invalid("no beneficiaries".to_string()));
        }

        let mut beneficiaries = Vec::with_capacity(expense.beneficiaries.len());
        for id in &expense.beneficiaries {
            let position = *positions
                .get(id)
                .ok_or_else(|| invalid(format!("beneficiary {} is not in the event", id)))?;
            beneficiaries.push(position);
        }
        beneficiaries.sort_unstable();
        if beneficiaries.windows(2).any(|w| w[0] == w[1]) {
            return Err(invalid("beneficiary listed twice".to_string()));
        }

        let shares = split_amount(expense.amount, beneficiaries.len());
        for (position, share) in beneficiaries.into_iter().zip(shares) {
            balances[payer] = balances[payer]
                .checked_add(share)
                .ok_or_else(|| invalid("balance overflow".to_string()))?;
            balances[position] = balances[position]
                .checked_sub(share)
                .ok_or_else(|| invalid("balance overflow".to_string()))?;
        }
    }

    let total: i128 = balances.iter().map(|b| i128::from(*b)).sum();
    if total != 0 {
        return Err(SettlementError::Unbalanced {
            total: saturate(total),
        });
    }

    Ok(participants
        .iter()
        .zip(balances)
        .map(|(p, balance)| ParticipantBalance {
            participant: p.id,
            balance,
        })
        .collect())
}
