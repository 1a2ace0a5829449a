mod common;

use anyhow::Result;
use common::{test_service, Trip};
use divvy::application::AppError;
use divvy::domain::{EventId, NewExpense, MAX_AMOUNT};

#[tokio::test]
async fn test_create_event_defaults() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let event = service.create_event("   ", None).await?;
    assert_eq!(event.name, "New Event");
    assert_eq!(event.currency.code(), "UAH");
    assert_eq!(event.id.as_str().len(), 32);

    let loaded = service.get_event(&event.id).await?;
    assert_eq!(loaded.name, "New Event");
    assert_eq!(loaded.currency, event.currency);

    Ok(())
}

#[tokio::test]
async fn test_event_ids_are_unique() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let first = service.create_event("Trip", None).await?;
    let second = service.create_event("Trip", None).await?;
    assert_ne!(first.id, second.id);

    Ok(())
}

#[tokio::test]
async fn test_create_event_rejects_bad_currency() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service.create_event("Trip", Some("EURO")).await;
    assert!(matches!(result, Err(AppError::InvalidCurrency(_))));

    Ok(())
}

#[tokio::test]
async fn test_participant_names_are_trimmed_and_required() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let event = service.create_event("Trip", None).await?;

    let alice = service.add_participant(&event.id, "  Alice ").await?;
    assert_eq!(alice.name, "Alice");

    let result = service.add_participant(&event.id, "   ").await;
    assert!(matches!(result, Err(AppError::InvalidName(_))));

    let result = service
        .add_participant(&EventId::from("missing"), "Bob")
        .await;
    assert!(matches!(result, Err(AppError::EventNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_snapshot_lists_in_insertion_order() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = Trip::create(&service, "EUR").await?;

    service
        .add_expense(&trip.event.id, NewExpense::new("Breakfast", 1200, trip.cara))
        .await?;
    service
        .add_expense(&trip.event.id, NewExpense::new("", 800, trip.bob))
        .await?;

    let snapshot = service.get_snapshot(&trip.event.id).await?;
    let names: Vec<&str> = snapshot.participants.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob", "Cara"]);

    let titles: Vec<&str> = snapshot.expenses.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Breakfast", "Expense"]);

    Ok(())
}

#[tokio::test]
async fn test_default_beneficiaries_are_fixed_at_creation() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let event = service.create_event("Trip", Some("EUR")).await?;
    let alice = service.add_participant(&event.id, "Alice").await?.id;
    let bob = service.add_participant(&event.id, "Bob").await?.id;

    let expense = service
        .add_expense(&event.id, NewExpense::new("Dinner", 6000, alice))
        .await?;
    assert_eq!(expense.beneficiaries, vec![alice, bob]);

    // Joining later does not pull Cara into the earlier expense
    let cara = service.add_participant(&event.id, "Cara").await?.id;

    let settlement = service.settle(&event.id).await?;
    let balances: Vec<(i64, i64)> = settlement
        .balances
        .iter()
        .map(|b| (b.participant, b.balance))
        .collect();
    assert_eq!(balances, vec![(alice, 3000), (bob, -3000), (cara, 0)]);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_beneficiaries_are_collapsed() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = Trip::create(&service, "EUR").await?;

    let expense = service
        .add_expense(
            &trip.event.id,
            NewExpense::new("Cab", 1000, trip.alice)
                .with_beneficiaries(vec![trip.cara, trip.bob, trip.cara]),
        )
        .await?;
    assert_eq!(expense.beneficiaries, vec![trip.bob, trip.cara]);

    Ok(())
}

#[tokio::test]
async fn test_expense_validation() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = Trip::create(&service, "EUR").await?;
    let other = Trip::create(&service, "EUR").await?;
    let id = &trip.event.id;

    let result = service
        .add_expense(id, NewExpense::new("Free", 0, trip.alice))
        .await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));

    let result = service
        .add_expense(id, NewExpense::new("Refund", -100, trip.alice))
        .await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));

    let result = service
        .add_expense(id, NewExpense::new("Yacht", MAX_AMOUNT + 1, trip.alice))
        .await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));

    let result = service
        .add_expense(id, NewExpense::new("Stranger", 100, other.alice))
        .await;
    assert!(matches!(result, Err(AppError::InvalidPayer(p)) if p == other.alice));

    let result = service
        .add_expense(
            id,
            NewExpense::new("Mixed", 100, trip.alice).with_beneficiaries(vec![trip.bob, other.bob]),
        )
        .await;
    assert!(matches!(result, Err(AppError::InvalidBeneficiaries(_))));

    let result = service
        .add_expense(
            &EventId::from("missing"),
            NewExpense::new("Nowhere", 100, trip.alice),
        )
        .await;
    assert!(matches!(result, Err(AppError::EventNotFound(_))));

    // Nothing was written
    let snapshot = service.get_snapshot(id).await?;
    assert!(snapshot.expenses.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_participant_in_use_cannot_be_removed() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = Trip::create(&service, "EUR").await?;
    let id = &trip.event.id;

    let expense = service
        .add_expense(
            id,
            NewExpense::new("Lunch", 2000, trip.alice).with_beneficiaries(vec![trip.bob]),
        )
        .await?;

    // Payer
    let result = service.remove_participant(id, trip.alice).await;
    assert!(matches!(
        result,
        Err(AppError::ParticipantInUse { ref name, expenses: 1 }) if name == "Alice"
    ));

    // Beneficiary
    let result = service.remove_participant(id, trip.bob).await;
    assert!(matches!(result, Err(AppError::ParticipantInUse { .. })));

    // Unreferenced
    let removed = service.remove_participant(id, trip.cara).await?;
    assert_eq!(removed.name, "Cara");

    service.remove_expense(id, expense.id).await?;
    service.remove_participant(id, trip.alice).await?;
    service.remove_participant(id, trip.bob).await?;

    let snapshot = service.get_snapshot(id).await?;
    assert!(snapshot.participants.is_empty());
    assert!(snapshot.expenses.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_remove_unknown_records() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = Trip::create(&service, "EUR").await?;
    let other = Trip::create(&service, "EUR").await?;
    let id = &trip.event.id;

    let result = service.remove_participant(id, 9999).await;
    assert!(matches!(result, Err(AppError::ParticipantNotFound(9999))));

    // Participant of a different event
    let result = service.remove_participant(id, other.alice).await;
    assert!(matches!(result, Err(AppError::ParticipantNotFound(_))));

    let result = service.remove_expense(id, 9999).await;
    assert!(matches!(result, Err(AppError::ExpenseNotFound(9999))));

    let expense = service
        .add_expense(&other.event.id, NewExpense::new("Theirs", 100, other.alice))
        .await?;
    let result = service.remove_expense(id, expense.id).await;
    assert!(matches!(result, Err(AppError::ExpenseNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_removing_an_expense_updates_settlement() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = Trip::create(&service, "EUR").await?;
    let id = &trip.event.id;

    let first = service
        .add_expense(id, NewExpense::new("Hotel", 9000, trip.alice))
        .await?;
    service
        .add_expense(id, NewExpense::new("Fuel", 3000, trip.bob))
        .await?;

    service.remove_expense(id, first.id).await?;

    let settlement = service.settle(id).await?;
    let balances: Vec<i64> = settlement.balances.iter().map(|b| b.balance).collect();
    assert_eq!(balances, vec![-1000, 2000, -1000]);

    Ok(())
}

#[tokio::test]
async fn test_delete_event_removes_everything() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = Trip::create(&service, "EUR").await?;
    let other = Trip::create(&service, "EUR").await?;

    service
        .add_expense(&trip.event.id, NewExpense::new("Dinner", 9000, trip.alice))
        .await?;
    service
        .add_expense(&other.event.id, NewExpense::new("Dinner", 3000, other.bob))
        .await?;

    let deleted = service.delete_event(&trip.event.id).await?;
    assert_eq!(deleted.id, trip.event.id);

    let result = service.get_snapshot(&trip.event.id).await;
    assert!(matches!(result, Err(AppError::EventNotFound(_))));

    let result = service.delete_event(&trip.event.id).await;
    assert!(matches!(result, Err(AppError::EventNotFound(_))));

    // Other events are untouched
    let snapshot = service.get_snapshot(&other.event.id).await?;
    assert_eq!(snapshot.participants.len(), 3);
    assert_eq!(snapshot.expenses.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_largest_amounts_still_settle() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let trip = Trip::create(&service, "EUR").await?;
    let id = &trip.event.id;

    for _ in 0..20 {
        service
            .add_expense(
                id,
                NewExpense::new("Fleet", MAX_AMOUNT, trip.alice).with_beneficiaries(vec![trip.bob]),
            )
            .await?;
    }

    let settlement = service.settle(id).await?;
    assert_eq!(settlement.balances[0].balance, 20 * MAX_AMOUNT);
    assert_eq!(settlement.transfers.len(), 1);
    assert_eq!(settlement.transfers[0].amount, 20 * MAX_AMOUNT);

    Ok(())
}
