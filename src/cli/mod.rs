use std::fs::File;
use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::application::{Settlement, SplitService};
use crate::domain::{share_link, Event, EventId, EventSnapshot, ExpenseId, NewExpense, ParticipantId};
use crate::io::{Bookmarks, Exporter};

/// Divvy - Shared Expense Ledger
#[derive(Parser)]
#[command(name = "divvy")]
#[command(about = "Track shared group expenses and settle them with as few transfers as possible")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "DIVVY_DATABASE", default_value = "divvy.db")]
    pub database: String,

    /// Log filter level (error, warn, info, debug, trace)
    #[arg(long, env = "DIVVY_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Base URL used to build share links
    #[arg(long, env = "DIVVY_BASE_URL", default_value = "http://localhost:8000")]
    pub base_url: String,

    /// File that remembers recently visited events
    #[arg(long, env = "DIVVY_BOOKMARKS", default_value = "divvy-bookmarks.json")]
    pub bookmarks: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Event management commands
    #[command(subcommand)]
    Event(EventCommands),

    /// Participant management commands
    #[command(subcommand)]
    Participant(ParticipantCommands),

    /// Expense management commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Show balances and the transfers that settle an event
    Settle {
        /// Event ID
        event: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = SettleFormat::Table)]
        format: SettleFormat,
    },

    /// Export event data to CSV or JSON
    Export {
        /// Event ID
        event: String,

        /// What to export
        #[arg(value_enum)]
        export_type: ExportType,

        /// Output format (`full` is always JSON)
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Recently visited events
    #[command(subcommand)]
    Bookmarks(BookmarkCommands),
}

#[derive(Subcommand)]
pub enum EventCommands {
    /// Create a new event
    Create {
        /// Event name
        name: String,

        /// Currency code (e.g., UAH, EUR, USD)
        #[arg(short, long)]
        currency: Option<String>,
    },

    /// Show participants and expenses of an event
    Show {
        /// Event ID
        id: String,
    },

    /// Delete an event with all its participants and expenses
    Delete {
        /// Event ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ParticipantCommands {
    /// Add a participant to an event
    Add {
        /// Event ID
        event: String,

        /// Participant name
        name: String,
    },

    /// Remove a participant (fails while expenses reference them)
    Remove {
        /// Event ID
        event: String,

        /// Participant ID
        id: ParticipantId,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense
    Add {
        /// Event ID
        event: String,

        /// Amount paid (e.g., "90.00" or "90")
        amount: String,

        /// What the money was spent on
        #[arg(short, long, default_value = "")]
        title: String,

        /// Participant ID of the payer
        #[arg(long)]
        paid_by: ParticipantId,

        /// Participant ID of a beneficiary (repeatable; omit for everyone)
        #[arg(long = "for")]
        beneficiaries: Vec<ParticipantId>,
    },

    /// Remove an expense
    Remove {
        /// Event ID
        event: String,

        /// Expense ID
        id: ExpenseId,
    },
}

#[derive(Subcommand)]
pub enum BookmarkCommands {
    /// List remembered events
    List,

    /// Forget a remembered event
    Forget {
        /// Event ID
        id: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SettleFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportType {
    Expenses,
    Balances,
    Transfers,
    Full,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let bookmarks = Bookmarks::new(&self.bookmarks);

        match self.command {
            Commands::Init => {
                SplitService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Event(cmd) => {
                let service = SplitService::connect(&self.database).await?;
                run_event_command(&service, &bookmarks, &self.base_url, cmd).await?;
            }

            Commands::Participant(cmd) => {
                let service = SplitService::connect(&self.database).await?;
                run_participant_command(&service, cmd).await?;
            }

            Commands::Expense(cmd) => {
                let service = SplitService::connect(&self.database).await?;
                run_expense_command(&service, cmd).await?;
            }

            Commands::Settle { event, format } => {
                let service = SplitService::connect(&self.database).await?;
                let settlement = service.settle(&EventId::from(event)).await?;
                match format {
                    SettleFormat::Table => print_settlement(&settlement),
                    SettleFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&settlement.view())?)
                    }
                }
            }

            Commands::Export {
                event,
                export_type,
                format,
                output,
            } => {
                let service = SplitService::connect(&self.database).await?;
                run_export_command(
                    &service,
                    &EventId::from(event),
                    export_type,
                    format,
                    output.as_deref(),
                )
                .await?;
            }

            Commands::Bookmarks(cmd) => run_bookmark_command(&bookmarks, &self.base_url, cmd)?,
        }

        Ok(())
    }
}

async fn run_event_command(
    service: &SplitService,
    bookmarks: &Bookmarks,
    base_url: &str,
    cmd: EventCommands,
) -> Result<()> {
    match cmd {
        EventCommands::Create { name, currency } => {
            let event = service.create_event(&name, currency.as_deref()).await?;
            remember(bookmarks, &event);
            println!("Created event: {} ({})", event.name, event.currency);
            println!("  ID:   {}", event.id);
            println!("  Link: {}", share_link(base_url, &event.id));
        }

        EventCommands::Show { id } => {
            let snapshot = service.get_snapshot(&EventId::from(id)).await?;
            remember(bookmarks, &snapshot.event);
            print_snapshot(&snapshot, base_url);
        }

        EventCommands::Delete { id } => {
            let event = service.delete_event(&EventId::from(id)).await?;
            if let Err(err) = bookmarks.forget(&event.id) {
                tracing::warn!(error = %err, "could not update bookmarks");
            }
            println!("Deleted event: {} ({})", event.name, event.id);
        }
    }
    Ok(())
}

async fn run_participant_command(service: &SplitService, cmd: ParticipantCommands) -> Result<()> {
    match cmd {
        ParticipantCommands::Add { event, name } => {
            let participant = service.add_participant(&EventId::from(event), &name).await?;
            println!("Added participant: {} (ID {})", participant.name, participant.id);
        }

        ParticipantCommands::Remove { event, id } => {
            let participant = service.remove_participant(&EventId::from(event), id).await?;
            println!("Removed participant: {} (ID {})", participant.name, participant.id);
        }
    }
    Ok(())
}

async fn run_expense_command(service: &SplitService, cmd: ExpenseCommands) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            event,
            amount,
            title,
            paid_by,
            beneficiaries,
        } => {
            let event_id = EventId::from(event);
            let event = service.get_event(&event_id).await?;
            let amount = event.currency.parse_amount(&amount).with_context(|| {
                format!("Invalid amount format '{}'. Use '90.00' or '90'", amount)
            })?;

            let expense = service
                .add_expense(
                    &event_id,
                    NewExpense::new(title, amount, paid_by).with_beneficiaries(beneficiaries),
                )
                .await?;
            println!(
                "Recorded expense: {} {} {} (ID {}, split {} ways)",
                expense.title,
                event.currency.format_amount(expense.amount),
                event.currency,
                expense.id,
                expense.beneficiaries.len()
            );
        }

        ExpenseCommands::Remove { event, id } => {
            service.remove_expense(&EventId::from(event), id).await?;
            println!("Removed expense: {}", id);
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &SplitService,
    event_id: &EventId,
    export_type: ExportType,
    format: Option<ExportFormat>,
    output: Option<&str>,
) -> Result<()> {
    if export_type == ExportType::Full && format == Some(ExportFormat::Csv) {
        bail!("The full export is only available as JSON");
    }

    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create output file '{}'", path))?,
        ),
        None => Box::new(io::stdout()),
    };

    let exporter = Exporter::new(service);
    let format = format.unwrap_or(ExportFormat::Csv);
    let count = match (export_type, format) {
        (ExportType::Expenses, ExportFormat::Csv) => {
            exporter.export_expenses_csv(event_id, writer).await?
        }
        (ExportType::Expenses, ExportFormat::Json) => {
            exporter.export_expenses_json(event_id, writer).await?
        }
        (ExportType::Balances, ExportFormat::Csv) => {
            exporter.export_balances_csv(event_id, writer).await?
        }
        (ExportType::Balances, ExportFormat::Json) => {
            exporter.export_balances_json(event_id, writer).await?
        }
        (ExportType::Transfers, ExportFormat::Csv) => {
            exporter.export_transfers_csv(event_id, writer).await?
        }
        (ExportType::Transfers, ExportFormat::Json) => {
            exporter.export_transfers_json(event_id, writer).await?
        }
        (ExportType::Full, _) => {
            let export = exporter.export_full_json(event_id, writer).await?;
            export.snapshot.expenses.len()
        }
    };

    if let Some(path) = output {
        eprintln!("Exported {} record(s) to {}", count, path);
    }
    Ok(())
}

fn run_bookmark_command(bookmarks: &Bookmarks, base_url: &str, cmd: BookmarkCommands) -> Result<()> {
    match cmd {
        BookmarkCommands::List => {
            let list = bookmarks.list()?;
            if list.is_empty() {
                println!("No remembered events.");
                return Ok(());
            }
            println!("{:<24} {:<8} {:<12} LINK", "NAME", "CURRENCY", "CREATED");
            println!("{}", "-".repeat(80));
            for bookmark in list {
                println!(
                    "{:<24} {:<8} {:<12} {}",
                    bookmark.name,
                    bookmark.currency,
                    bookmark.created_at.format("%Y-%m-%d"),
                    share_link(base_url, &bookmark.id)
                );
            }
        }

        BookmarkCommands::Forget { id } => {
            let id = EventId::from(id);
            if bookmarks.forget(&id)? {
                println!("Forgot event: {}", id);
            } else {
                println!("Event was not remembered: {}", id);
            }
        }
    }
    Ok(())
}

/// Best effort: a bookmark write failure is only logged.
fn remember(bookmarks: &Bookmarks, event: &Event) {
    if let Err(err) = bookmarks.remember(event) {
        tracing::warn!(error = %err, "could not update bookmarks");
    }
}

fn print_snapshot(snapshot: &EventSnapshot, base_url: &str) {
    let event = &snapshot.event;
    let currency = &event.currency;

    println!("Event: {}", event.name);
    println!("  ID:       {}", event.id);
    println!("  Currency: {}", currency);
    println!("  Created:  {}", event.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Link:     {}", share_link(base_url, &event.id));
    println!();

    if snapshot.participants.is_empty() {
        println!("No participants yet.");
    } else {
        println!("{:<6} NAME", "ID");
        println!("{}", "-".repeat(30));
        for participant in &snapshot.participants {
            println!("{:<6} {}", participant.id, participant.name);
        }
    }
    println!();

    if snapshot.expenses.is_empty() {
        println!("No expenses yet.");
        return;
    }

    let name_of = |id: ParticipantId| {
        snapshot
            .participants
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.as_str())
            .unwrap_or("?")
    };

    println!(
        "{:<6} {:<24} {:>12} {:<16} FOR",
        "ID", "TITLE", "AMOUNT", "PAID BY"
    );
    println!("{}", "-".repeat(80));
    for expense in &snapshot.expenses {
        let beneficiaries: Vec<&str> = expense.beneficiaries.iter().map(|id| name_of(*id)).collect();
        println!(
            "{:<6} {:<24} {:>12} {:<16} {}",
            expense.id,
            expense.title,
            currency.format_amount(expense.amount),
            name_of(expense.paid_by),
            beneficiaries.join(", ")
        );
    }
}

fn print_settlement(settlement: &Settlement) {
    let view = settlement.view();

    println!("Balances ({})", view.currency);
    println!("{:<24} {:>14}", "PARTICIPANT", "BALANCE");
    println!("{}", "-".repeat(40));
    for line in &view.balances {
        println!("{:<24} {:>14}", line.name, line.balance);
    }
    println!();

    if view.transfers.is_empty() {
        println!("Everyone is settled up.");
        return;
    }

    println!("Transfers");
    println!("{:<20} {:<20} {:>14}", "FROM", "TO", "AMOUNT");
    println!("{}", "-".repeat(56));
    for transfer in &view.transfers {
        println!(
            "{:<20} {:<20} {:>14}",
            transfer.from, transfer.to, transfer.amount
        );
    }
}
