mod common;

use anyhow::Result;
use budgetbook::application::AppError;
use budgetbook::domain::{BudgetUpdate, NewBudget, ValidationError};
use common::{OWNER, add_expense, create_budget, test_service};
use uuid::Uuid;

#[tokio::test]
async fn test_budget_starts_with_full_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let budget = create_budget(&service, OWNER, "Groceries", 10000).await?;
    assert_eq!(budget.total_cents, 10000);
    assert_eq!(budget.remaining_cents, 10000);
    assert_eq!(budget.expenses_cents, 0);

    let stored = service.get_budget(&budget.id.to_string()).await?;
    assert_eq!(stored, budget);

    Ok(())
}

#[tokio::test]
async fn test_list_budgets_by_owner() -> Result<()> {
    let (service, _temp) = test_service().await?;

    create_budget(&service, OWNER, "Groceries", 40000).await?;
    create_budget(&service, OWNER, "Entertainment", 10000).await?;
    create_budget(&service, "someone-else", "Rent", 90000).await?;

    let budgets = service.list_budgets(OWNER).await?;
    assert_eq!(budgets.len(), 2);
    assert!(budgets.iter().all(|b| b.owner == OWNER));
    assert!(budgets.iter().any(|b| b.title == "Groceries"));
    assert!(budgets.iter().any(|b| b.title == "Entertainment"));

    // An owner without budgets gets an empty list
    assert!(service.list_budgets("nobody").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_create_budget_rejects_invalid_input() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service
        .create_budget(NewBudget {
            uid: OWNER.into(),
            title: "Holiday".into(),
            total_amount: -500,
            date: None,
        })
        .await;
    assert!(matches!(
        result,
        Err(AppError::Validation(ValidationError::NegativeAmount { .. }))
    ));

    let result = service
        .create_budget(NewBudget {
            uid: "".into(),
            title: "Holiday".into(),
            total_amount: 500,
            date: None,
        })
        .await;
    assert!(matches!(
        result,
        Err(AppError::Validation(ValidationError::BlankField("uid")))
    ));

    assert!(service.list_budgets(OWNER).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_update_budget_title_and_date() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let budget = create_budget(&service, OWNER, "Groceries", 10000).await?;

    let updated = service
        .update_budget(
            &budget.id.to_string(),
            BudgetUpdate {
                title: Some("Food".into()),
                date: Some(common::parse_date("2024-06-01")),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.title, "Food");
    assert_eq!(updated.total_cents, 10000);
    assert_eq!(updated.remaining_cents, 10000);

    let stored = service.get_budget(&budget.id.to_string()).await?;
    assert_eq!(stored.title, "Food");
    assert_eq!(stored.date, common::parse_date("2024-06-01"));

    Ok(())
}

#[tokio::test]
async fn test_update_budget_total_recomputes_remaining() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let budget = create_budget(&service, OWNER, "Groceries", 10000).await?;
    add_expense(&service, &budget, 4000, "weekly shop", "2024-01-05").await?;

    let updated = service
        .update_budget(
            &budget.id.to_string(),
            BudgetUpdate {
                total_amount: Some(15000),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.total_cents, 15000);
    assert_eq!(updated.expenses_cents, 4000);
    assert_eq!(updated.remaining_cents, 11000);

    let stored = service.get_budget(&budget.id.to_string()).await?;
    assert_eq!(stored.remaining_cents, 11000);

    Ok(())
}

#[tokio::test]
async fn test_update_budget_total_below_spent_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let budget = create_budget(&service, OWNER, "Groceries", 10000).await?;
    add_expense(&service, &budget, 6000, "big shop", "2024-01-05").await?;

    let result = service
        .update_budget(
            &budget.id.to_string(),
            BudgetUpdate {
                total_amount: Some(5000),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(AppError::InsufficientFunds {
            available: 5000,
            required: 6000
        })
    ));

    let stored = service.get_budget(&budget.id.to_string()).await?;
    assert_eq!(stored.total_cents, 10000);
    assert_eq!(stored.remaining_cents, 4000);

    Ok(())
}

#[tokio::test]
async fn test_update_missing_or_malformed_budget() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let update = BudgetUpdate {
        title: Some("Anything".into()),
        ..Default::default()
    };

    let result = service
        .update_budget(&Uuid::new_v4().to_string(), update.clone())
        .await;
    assert!(matches!(result, Err(AppError::BudgetNotFound(_))));

    let result = service.update_budget("not-an-id", update).await;
    assert!(matches!(result, Err(AppError::InvalidId { kind: "budget", .. })));

    Ok(())
}

#[tokio::test]
async fn test_delete_budget_leaves_expenses_orphaned() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let budget = create_budget(&service, OWNER, "Groceries", 10000).await?;
    let expense = add_expense(&service, &budget, 2500, "bread", "2024-01-05").await?;

    let deleted = service.delete_budget(&budget.id.to_string()).await?;
    assert_eq!(deleted.id, budget.id);

    let result = service.get_budget(&budget.id.to_string()).await;
    assert!(matches!(result, Err(AppError::BudgetNotFound(_))));

    // The expense row survives, still pointing at the deleted budget
    let orphan = service.get_expense(&expense.id.to_string()).await?;
    assert_eq!(orphan.budget_id, budget.id);

    // Deleting twice is a not-found
    let result = service.delete_budget(&budget.id.to_string()).await;
    assert!(matches!(result, Err(AppError::BudgetNotFound(_))));

    Ok(())
}
