// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use budgetbook::application::LedgerService;
use budgetbook::domain::{Budget, Cents, Expense, NewBudget, NewExpense};
use chrono::{DateTime, NaiveDate, Utc};
use tempfile::TempDir;

pub const OWNER: &str = "firebase-user-1";

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

pub async fn create_budget(
    service: &LedgerService,
    owner: &str,
    title: &str,
    total: Cents,
) -> Result<Budget> {
    Ok(service
        .create_budget(NewBudget {
            uid: owner.to_string(),
            title: title.to_string(),
            total_amount: total,
            date: Some(parse_date("2024-01-01")),
        })
        .await?)
}

pub fn new_expense(budget: &Budget, amount: Cents, description: &str, date: &str) -> NewExpense {
    NewExpense {
        budget_id: budget.id.to_string(),
        amount,
        description: description.to_string(),
        date: Some(parse_date(date)),
        user_id: budget.owner.clone(),
    }
}

pub async fn add_expense(
    service: &LedgerService,
    budget: &Budget,
    amount: Cents,
    description: &str,
    date: &str,
) -> Result<Expense> {
    let posted = service
        .create_expense(new_expense(budget, amount, description, date))
        .await?;
    Ok(posted.expense)
}
