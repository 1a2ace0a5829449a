use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    compute_balances, plan_settlement, Currency, EventSnapshot, MinorUnits, ParticipantId,
    SettlementError,
};

/// Balances plus the transfer plan for one event, in minor units.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub currency: Currency,
    pub balances: Vec<BalanceLine>,
    pub transfers: Vec<TransferLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceLine {
    pub participant: ParticipantId,
    pub name: String,
    pub balance: MinorUnits,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLine {
    pub from: ParticipantId,
    pub from_name: String,
    pub to: ParticipantId,
    pub to_name: String,
    pub amount: MinorUnits,
}

/// Run the balance calculator and the settlement planner over a snapshot.
/// Either both succeed and the result is complete, or nothing is returned.
pub fn settle_snapshot(snapshot: &EventSnapshot) -> Result<Settlement, SettlementError> {
    let balances = compute_balances(&snapshot.participants, &snapshot.expenses)?;
    let transfers = plan_settlement(&balances)?;

    let names: HashMap<ParticipantId, &str> = snapshot
        .participants
        .iter()
        .map(|p| (p.id, p.name.as_str()))
        .collect();
    let name_of = |id: ParticipantId| names.get(&id).copied().unwrap_or_default().to_string();

    Ok(Settlement {
        currency: snapshot.event.currency.clone(),
        balances: balances
            .iter()
            .map(|b| BalanceLine {
                participant: b.participant,
                name: name_of(b.participant),
                balance: b.balance,
            })
            .collect(),
        transfers: transfers
            .iter()
            .map(|t| TransferLine {
                from: t.from,
                from_name: name_of(t.from),
                to: t.to,
                to_name: name_of(t.to),
                amount: t.amount,
            })
            .collect(),
    })
}

impl Settlement {
    /// Render amounts as decimal strings in the event currency.
    pub fn view(&self) -> SettlementView {
        SettlementView {
            currency: self.currency.code().to_string(),
            balances: self
                .balances
                .iter()
                .map(|b| BalanceView {
                    participant_id: b.participant,
                    name: b.name.clone(),
                    balance: self.currency.format_balance(b.balance),
                })
                .collect(),
            transfers: self
                .transfers
                .iter()
                .map(|t| TransferView {
                    from: t.from_name.clone(),
                    to: t.to_name.clone(),
                    amount: self.currency.format_amount(t.amount),
                })
                .collect(),
        }
    }
}

/// Wire shape of a settlement: decimal strings, balances signed explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementView {
    pub currency: String,
    pub balances: Vec<BalanceView>,
    pub transfers: Vec<TransferView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceView {
    pub participant_id: ParticipantId,
    pub name: String,
    pub balance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferView {
    pub from: String,
    pub to: String,
    pub amount: String,
}
