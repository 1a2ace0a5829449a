use anyhow::Result;
use divvy::domain::{Currency, Event, NewExpense};
use divvy::storage::{Repository, StoreError};
use tempfile::TempDir;

async fn test_repo() -> Result<(Repository, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("repo.db");
    let repo = Repository::init(&format!("sqlite:{}?mode=rwc", db_path.display())).await?;
    Ok((repo, temp_dir))
}

#[tokio::test]
async fn test_event_round_trip() -> Result<()> {
    let (repo, _temp) = test_repo().await?;
    let event = Event::new("Ski week", Currency::parse("chf")?);

    repo.save_event(&event).await?;

    let loaded = repo.get_event(&event.id).await?.expect("event should exist");
    assert_eq!(loaded.name, "Ski week");
    assert_eq!(loaded.currency.code(), "CHF");
    assert_eq!(loaded.created_at.timestamp(), event.created_at.timestamp());

    Ok(())
}

#[tokio::test]
async fn test_get_participant_is_scoped_to_event() -> Result<()> {
    let (repo, _temp) = test_repo().await?;
    let first = Event::new("First", Currency::default());
    let second = Event::new("Second", Currency::default());
    repo.save_event(&first).await?;
    repo.save_event(&second).await?;

    let alice = repo.insert_participant(&first.id, "Alice").await?;

    let found = repo.get_participant(&first.id, alice.id).await?;
    assert_eq!(found, Some(alice.clone()));
    assert_eq!(repo.get_participant(&second.id, alice.id).await?, None);

    Ok(())
}

#[tokio::test]
async fn test_get_expense_returns_stored_beneficiaries() -> Result<()> {
    let (repo, _temp) = test_repo().await?;
    let event = Event::new("Trip", Currency::default());
    repo.save_event(&event).await?;
    let alice = repo.insert_participant(&event.id, "Alice").await?.id;
    let bob = repo.insert_participant(&event.id, "Bob").await?.id;

    let saved = repo
        .insert_expense(&event.id, &NewExpense::new("  Groceries ", 4200, bob))
        .await?;

    let loaded = repo
        .get_expense(&event.id, saved.id)
        .await?
        .expect("expense should exist");
    assert_eq!(loaded.title, "Groceries");
    assert_eq!(loaded.amount, 4200);
    assert_eq!(loaded.paid_by, bob);
    assert_eq!(loaded.beneficiaries, vec![alice, bob]);

    Ok(())
}

#[tokio::test]
async fn test_rejected_expense_writes_nothing() -> Result<()> {
    let (repo, _temp) = test_repo().await?;
    let event = Event::new("Trip", Currency::default());
    repo.save_event(&event).await?;
    let alice = repo.insert_participant(&event.id, "Alice").await?.id;

    let result = repo
        .insert_expense(
            &event.id,
            &NewExpense::new("Lunch", 1000, alice).with_beneficiaries(vec![alice, 4242]),
        )
        .await;
    assert!(matches!(result, Err(StoreError::ForeignBeneficiary(4242))));

    let snapshot = repo.load_snapshot(&event.id).await?.expect("event should exist");
    assert!(snapshot.expenses.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_delete_event_cascades() -> Result<()> {
    let (repo, _temp) = test_repo().await?;
    let event = Event::new("Trip", Currency::default());
    repo.save_event(&event).await?;
    let alice = repo.insert_participant(&event.id, "Alice").await?;
    let expense = repo
        .insert_expense(&event.id, &NewExpense::new("Dinner", 1500, alice.id))
        .await?;

    repo.delete_event(&event.id).await?;

    assert!(repo.get_event(&event.id).await?.is_none());
    assert!(repo.load_snapshot(&event.id).await?.is_none());
    assert!(repo.get_participant(&event.id, alice.id).await?.is_none());
    assert!(repo.get_expense(&event.id, expense.id).await?.is_none());

    Ok(())
}
