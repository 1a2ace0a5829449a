use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;

use crate::application::{SettlementView, SplitService};
use crate::domain::{EventId, EventSnapshot, ParticipantId};

/// Full export of one event: the stored records plus the settlement they imply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventExport {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: EventSnapshot,
    pub settlement: SettlementView,
}

/// Exporter for writing one event's data in various formats
pub struct Exporter<'a> {
    service: &'a SplitService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a SplitService) -> Self {
        Self { service }
    }

    /// Export expenses to CSV format
    pub async fn export_expenses_csv<W: Write>(&self, event_id: &EventId, writer: W) -> Result<usize> {
        let snapshot = self.service.get_snapshot(event_id).await?;
        let currency = &snapshot.event.currency;
        let names: HashMap<ParticipantId, &str> = snapshot
            .participants
            .iter()
            .map(|p| (p.id, p.name.as_str()))
            .collect();
        let name_of = |id: &ParticipantId| names.get(id).copied().unwrap_or_default();

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([
            "id",
            "title",
            "amount",
            "currency",
            "paid_by",
            "beneficiaries",
            "created_at",
        ])?;

        let mut count = 0;
        for expense in &snapshot.expenses {
            let beneficiaries: Vec<&str> = expense.beneficiaries.iter().map(name_of).collect();
            csv_writer.write_record([
                expense.id.to_string(),
                expense.title.clone(),
                currency.format_amount(expense.amount),
                currency.code().to_string(),
                name_of(&expense.paid_by).to_string(),
                beneficiaries.join(";"),
                expense.created_at.to_rfc3339(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export per-participant balances to CSV format
    pub async fn export_balances_csv<W: Write>(&self, event_id: &EventId, writer: W) -> Result<usize> {
        let view = self.service.settle(event_id).await?.view();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["participant_id", "name", "balance", "currency"])?;

        let mut count = 0;
        for line in &view.balances {
            csv_writer.write_record([
                line.participant_id.to_string(),
                line.name.clone(),
                line.balance.clone(),
                view.currency.clone(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the settlement plan to CSV format
    pub async fn export_transfers_csv<W: Write>(&self, event_id: &EventId, writer: W) -> Result<usize> {
        let view = self.service.settle(event_id).await?.view();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["from", "to", "amount", "currency"])?;

        let mut count = 0;
        for transfer in &view.transfers {
            csv_writer.write_record([
                &transfer.from,
                &transfer.to,
                &transfer.amount,
                &view.currency,
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export expenses as a JSON array
    pub async fn export_expenses_json<W: Write>(&self, event_id: &EventId, writer: W) -> Result<usize> {
        let snapshot = self.service.get_snapshot(event_id).await?;
        write_json(writer, &snapshot.expenses)?;
        Ok(snapshot.expenses.len())
    }

    /// Export per-participant balances as a JSON array
    pub async fn export_balances_json<W: Write>(&self, event_id: &EventId, writer: W) -> Result<usize> {
        let view = self.service.settle(event_id).await?.view();
        write_json(writer, &view.balances)?;
        Ok(view.balances.len())
    }

    /// Export the settlement plan as a JSON array
    pub async fn export_transfers_json<W: Write>(&self, event_id: &EventId, writer: W) -> Result<usize> {
        let view = self.service.settle(event_id).await?.view();
        write_json(writer, &view.transfers)?;
        Ok(view.transfers.len())
    }

    /// Export the full event as a JSON document
    pub async fn export_full_json<W: Write>(&self, event_id: &EventId, mut writer: W) -> Result<EventExport> {
        let (snapshot, settlement) = self.service.snapshot_with_settlement(event_id).await?;

        let export = EventExport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            snapshot,
            settlement: settlement.view(),
        };

        write_json(&mut writer, &export)?;
        Ok(export)
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(mut writer: W, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
