use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{require_non_negative, require_text};
use super::{Cents, ValidationError, amount, date};

pub type BudgetId = Uuid;

/// A spending allowance with a running balance.
///
/// `remaining` and `expenses` always satisfy
/// `remaining_cents + expenses_cents == total_cents`; the repository only
/// moves money between the two inside a single conditional update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: BudgetId,
    /// Opaque owner id issued by the identity provider
    #[serde(rename = "uid")]
    pub owner: String,
    pub title: String,
    #[serde(rename = "totalAmount", with = "amount")]
    pub total_cents: Cents,
    #[serde(rename = "remaining", with = "amount")]
    pub remaining_cents: Cents,
    /// Cumulative amount posted against this budget
    #[serde(rename = "expenses", with = "amount")]
    pub expenses_cents: Cents,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(owner: String, title: String, total_cents: Cents, date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            title,
            total_cents,
            remaining_cents: total_cents,
            expenses_cents: 0,
            date,
            created_at: Utc::now(),
        }
    }

    pub fn can_cover(&self, amount_cents: Cents) -> bool {
        self.remaining_cents >= amount_cents
    }

    /// True when the stored remaining balance agrees with total minus expenses.
    pub fn is_balanced(&self) -> bool {
        self.remaining_cents == self.total_cents - self.expenses_cents
    }

    /// Share of the total already spent, in percent. Zero-total budgets report 0.
    pub fn utilization(&self) -> f64 {
        if self.total_cents == 0 {
            0.0
        } else {
            self.expenses_cents as f64 / self.total_cents as f64 * 100.0
        }
    }
}

/// Input for creating a budget.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBudget {
    pub uid: String,
    pub title: String,
    #[serde(with = "amount")]
    pub total_amount: Cents,
    #[serde(default, deserialize_with = "date::flexible::deserialize")]
    pub date: Option<DateTime<Utc>>,
}

impl NewBudget {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("uid", &self.uid)?;
        require_text("title", &self.title)?;
        require_non_negative("totalAmount", self.total_amount)
    }

    pub fn into_budget(self) -> Budget {
        let date = self.date.unwrap_or_else(Utc::now);
        Budget::new(self.uid, self.title.trim().to_string(), self.total_amount, date)
    }
}

/// Partial update for a budget. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, with = "amount::option")]
    pub total_amount: Option<Cents>,
    #[serde(default, deserialize_with = "date::flexible::deserialize")]
    pub date: Option<DateTime<Utc>>,
}

impl BudgetUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.is_none() && self.total_amount.is_none() && self.date.is_none() {
            return Err(ValidationError::EmptyUpdate);
        }
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(total) = self.total_amount {
            require_non_negative("totalAmount", total)?;
        }
        Ok(())
    }

    /// Merge into an existing budget. A new total keeps the posted expenses
    /// and recomputes the remaining balance from them.
    pub fn merge_into(&self, budget: &Budget) -> Budget {
        let mut merged = budget.clone();
        if let Some(title) = &self.title {
            merged.title = title.trim().to_string();
        }
        if let Some(total) = self.total_amount {
            merged.total_cents = total;
            merged.remaining_cents = total - merged.expenses_cents;
        }
        if let Some(date) = self.date {
            merged.date = date;
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groceries() -> Budget {
        Budget::new("user-1".into(), "Groceries".into(), 10000, Utc::now())
    }

    #[test]
    fn test_new_budget_starts_with_full_balance() {
        let budget = groceries();
        assert_eq!(budget.remaining_cents, 10000);
        assert_eq!(budget.expenses_cents, 0);
        assert!(budget.is_balanced());
        assert!(budget.can_cover(10000));
        assert!(!budget.can_cover(10001));
    }

    #[test]
    fn test_new_budget_validation() {
        let input = NewBudget {
            uid: "user-1".into(),
            title: "  ".into(),
            total_amount: 500,
            date: None,
        };
        assert_eq!(input.validate(), Err(ValidationError::BlankField("title")));

        let input = NewBudget {
            uid: "user-1".into(),
            title: "Rent".into(),
            total_amount: -1,
            date: None,
        };
        assert!(matches!(
            input.validate(),
            Err(ValidationError::NegativeAmount { .. })
        ));
    }

    #[test]
    fn test_zero_total_is_allowed() {
        let input = NewBudget {
            uid: "user-1".into(),
            title: "Nothing".into(),
            total_amount: 0,
            date: None,
        };
        assert!(input.validate().is_ok());
        assert_eq!(input.into_budget().utilization(), 0.0);
    }

    #[test]
    fn test_update_recomputes_remaining() {
        let mut budget = groceries();
        budget.remaining_cents = 6000;
        budget.expenses_cents = 4000;

        let update = BudgetUpdate {
            total_amount: Some(15000),
            ..Default::default()
        };
        let merged = update.merge_into(&budget);
        assert_eq!(merged.total_cents, 15000);
        assert_eq!(merged.remaining_cents, 11000);
        assert_eq!(merged.expenses_cents, 4000);
        assert_eq!(merged.title, "Groceries");
    }

    #[test]
    fn test_empty_update_is_rejected() {
        assert_eq!(
            BudgetUpdate::default().validate(),
            Err(ValidationError::EmptyUpdate)
        );
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(groceries()).unwrap();
        assert_eq!(json["uid"], "user-1");
        assert_eq!(json["totalAmount"], 100.0);
        assert_eq!(json["remaining"], 100.0);
        assert_eq!(json["expenses"], 0.0);
        assert!(json.get("createdAt").is_some());

        let input: NewBudget = serde_json::from_str(
            r#"{"uid": "u", "title": "Trip", "totalAmount": "250.75", "date": "2024-05-01"}"#,
        )
        .unwrap();
        assert_eq!(input.total_amount, 25075);
        assert!(input.date.is_some());
    }
}
