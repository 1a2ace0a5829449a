use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::money::saturate;
use super::{ExpenseId, MinorUnits, ParticipantBalance, ParticipantId};

/// Failures of the settlement engine. These only occur on a corrupt snapshot;
/// write-side validation is expected to keep them from ever happening.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("Invalid expense {expense}: {reason}")]
    InvalidExpense { expense: ExpenseId, reason: String },

    #[error("Balances do not sum to zero (total {total})")]
    Unbalanced { total: MinorUnits },

    #[error("Balance of participant {participant} is out of range")]
    OutOfRange { participant: ParticipantId },

    #[error("Settlement leaves participant {participant} with {residual}")]
    Unsettled {
        participant: ParticipantId,
        residual: MinorUnits,
    },
}

/// A single recommended payment: `from` pays `amount` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: ParticipantId,
    pub to: ParticipantId,
    /// Amount in minor units (always positive)
    pub amount: MinorUnits,
}

/// Heap entry: largest magnitude first, lowest participant id on ties.
type Entry = (MinorUnits, Reverse<ParticipantId>);

/// Produce an ordered list of transfers that brings every balance to zero.
///
/// Greedy largest-magnitude matching: the biggest debtor pays the biggest
/// creditor as much as either can absorb, and whoever is left over goes back
/// into the pool. This yields at most `n - 1` transfers for `n` non-zero
/// balances. It is a heuristic; the true minimum is NP-hard to find and this
/// does not promise to reach it.
///
/// Input balances must sum to zero. The plan is replayed before it is returned,
/// so a returned plan always settles every participant exactly.
pub fn plan_settlement(balances: &[ParticipantBalance]) -> Result<Vec<Transfer>, SettlementError> {
    let total: i128 = balances.iter().map(|b| i128::from(b.balance)).sum();
    if total != 0 {
        return Err(SettlementError::Unbalanced {
            total: saturate(total),
        });
    }

    let mut creditors: BinaryHeap<Entry> = BinaryHeap::new();
    let mut debtors: BinaryHeap<Entry> = BinaryHeap::new();
    for entry in balances {
        if entry.balance > 0 {
            creditors.push((entry.balance, Reverse(entry.participant)));
        } else if entry.balance < 0 {
            let debt = entry
                .balance
                .checked_neg()
                .ok_or(SettlementError::OutOfRange {
                    participant: entry.participant,
                })?;
            debtors.push((debt, Reverse(entry.participant)));
        }
    }

    let mut transfers = Vec::new();
    while !creditors.is_empty() && !debtors.is_empty() {
        let (Some((credit, Reverse(creditor))), Some((debt, Reverse(debtor)))) =
            (creditors.pop(), debtors.pop())
        else {
            break;
        };

        let amount = credit.min(debt);
        transfers.push(Transfer {
            from: debtor,
            to: creditor,
            amount,
        });

        if credit > amount {
            creditors.push((credit - amount, Reverse(creditor)));
        }
        if debt > amount {
            debtors.push((debt - amount, Reverse(debtor)));
        }
    }

    if let Some(left) = apply_transfers(balances, &transfers)
        .into_iter()
        .find(|b| b.balance != 0)
    {
        return Err(SettlementError::Unsettled {
            participant: left.participant,
            residual: left.balance,
        });
    }

    Ok(transfers)
}

/// Replay `transfers` on top of `balances` and return what remains.
/// Paying moves the payer up towards zero and the receiver down towards zero.
pub fn apply_transfers(
    balances: &[ParticipantBalance],
    transfers: &[Transfer],
) -> Vec<ParticipantBalance> {
    let mut running: HashMap<ParticipantId, i128> = balances
        .iter()
        .map(|b| (b.participant, i128::from(b.balance)))
        .collect();

    for transfer in transfers {
        *running.entry(transfer.from).or_insert(0) += i128::from(transfer.amount);
        *running.entry(transfer.to).or_insert(0) -= i128::from(transfer.amount);
    }

    let mut residual: Vec<ParticipantBalance> = balances
        .iter()
        .map(|b| ParticipantBalance {
            participant: b.participant,
            balance: saturate(running.remove(&b.participant).unwrap_or(0)),
        })
        .collect();
    // Participants that only show up in transfers
    let mut extra: Vec<ParticipantBalance> = running
        .into_iter()
        .map(|(participant, balance)| ParticipantBalance {
            participant,
            balance: saturate(balance),
        })
        .collect();
    extra.sort_by_key(|b| b.participant);
    residual.extend(extra);
    residual
}
