use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{require_positive, require_text};
use super::{BudgetId, Cents, ValidationError, amount, date};

pub type ExpenseId = Uuid;

/// A single debit posted against a budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    /// Budget this expense was posted against. The budget may since have been deleted.
    pub budget_id: BudgetId,
    #[serde(rename = "amount", with = "amount")]
    pub amount_cents: Cents,
    pub description: String,
    /// When the expense happened
    pub date: DateTime<Utc>,
    pub user_id: String,
    /// When it was recorded
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        budget_id: BudgetId,
        amount_cents: Cents,
        description: String,
        date: DateTime<Utc>,
        user_id: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            budget_id,
            amount_cents,
            description,
            date,
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// Input for posting an expense.
///
/// `budget_id` stays a raw string here: a malformed id is a validation
/// failure reported by the service, not a deserialization error.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub budget_id: String,
    #[serde(with = "amount")]
    pub amount: Cents,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "date::flexible::deserialize")]
    pub date: Option<DateTime<Utc>>,
    pub user_id: String,
}

impl NewExpense {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive("amount", self.amount)?;
        require_text("userId", &self.user_id)
    }

    pub fn into_expense(self, budget_id: BudgetId) -> Expense {
        let date = self.date.unwrap_or_else(Utc::now);
        Expense::new(
            budget_id,
            self.amount,
            self.description.trim().to_string(),
            date,
            self.user_id,
        )
    }
}

/// Partial update for an expense. The budget it is posted against cannot change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseUpdate {
    #[serde(default, with = "amount::option")]
    pub amount: Option<Cents>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "date::flexible::deserialize")]
    pub date: Option<DateTime<Utc>>,
}

impl ExpenseUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.amount.is_none() && self.description.is_none() && self.date.is_none() {
            return Err(ValidationError::EmptyUpdate);
        }
        if let Some(amount) = self.amount {
            require_positive("amount", amount)?;
        }
        Ok(())
    }

    pub fn merge_into(&self, expense: &Expense) -> Expense {
        let mut merged = expense.clone();
        if let Some(amount) = self.amount {
            merged.amount_cents = amount;
        }
        if let Some(description) = &self.description {
            merged.description = description.trim().to_string();
        }
        if let Some(date) = self.date {
            merged.date = date;
        }
        merged
    }
}

/// Title of the budget an expense belongs to, as shown next to the expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetTitle {
    pub title: String,
}

/// An expense joined with its budget's current title. `budget` is `None`
/// for orphans whose budget was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentExpense {
    pub id: ExpenseId,
    pub budget_id: BudgetId,
    #[serde(rename = "amount", with = "amount")]
    pub amount_cents: Cents,
    pub description: String,
    pub date: DateTime<Utc>,
    pub budget: Option<BudgetTitle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_expense_validation() {
        let input: NewExpense = serde_json::from_str(
            r#"{"budgetId": "x", "amount": 0, "description": "free lunch", "userId": "u"}"#,
        )
        .unwrap();
        assert!(matches!(
            input.validate(),
            Err(ValidationError::NonPositiveAmount { field: "amount", .. })
        ));

        let input: NewExpense =
            serde_json::from_str(r#"{"budgetId": "x", "amount": 5, "userId": " "}"#).unwrap();
        assert_eq!(input.validate(), Err(ValidationError::BlankField("userId")));
    }

    #[test]
    fn test_into_expense_defaults() {
        let input: NewExpense =
            serde_json::from_str(r#"{"budgetId": "x", "amount": 12.5, "userId": "u"}"#).unwrap();
        let budget_id = Uuid::new_v4();
        let expense = input.into_expense(budget_id);
        assert_eq!(expense.budget_id, budget_id);
        assert_eq!(expense.amount_cents, 1250);
        assert_eq!(expense.description, "");
    }

    #[test]
    fn test_update_merge_keeps_untouched_fields() {
        let original = Expense::new(
            Uuid::new_v4(),
            4000,
            "weekly shop".into(),
            Utc::now(),
            "u".into(),
        );
        let update = ExpenseUpdate {
            amount: Some(2500),
            ..Default::default()
        };
        assert!(update.validate().is_ok());

        let merged = update.merge_into(&original);
        assert_eq!(merged.amount_cents, 2500);
        assert_eq!(merged.description, "weekly shop");
        assert_eq!(merged.id, original.id);
        assert_eq!(merged.budget_id, original.budget_id);
    }

    #[test]
    fn test_update_rejects_non_positive_amount() {
        let update = ExpenseUpdate {
            amount: Some(-10),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_orphan_serializes_null_budget() {
        let recent = RecentExpense {
            id: Uuid::new_v4(),
            budget_id: Uuid::new_v4(),
            amount_cents: 999,
            description: "taxi".into(),
            date: Utc::now(),
            budget: None,
        };
        let json = serde_json::to_value(&recent).unwrap();
        assert!(json["budget"].is_null());
        assert_eq!(json["amount"], 9.99);
    }
}
