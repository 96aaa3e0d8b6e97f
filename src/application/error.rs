use thiserror::Error;

use crate::domain::{Cents, ValidationError, format_cents};

fn money(cents: &Cents) -> String {
    format_cents(*cents)
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid {kind} ID format: {value}")]
    InvalidId { kind: &'static str, value: String },

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Budget not found: {0}")]
    BudgetNotFound(String),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(String),

    /// An empty result set, reported as absence rather than an empty list.
    #[error("No expenses found for {0}")]
    NoExpenses(String),

    #[error(
        "Insufficient budget remaining: {} available, {} required",
        money(.available),
        money(.required)
    )]
    InsufficientFunds { available: Cents, required: Cents },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_message() {
        let err = AppError::InsufficientFunds {
            available: 6000,
            required: 7000,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient budget remaining: 60.00 available, 70.00 required"
        );
    }

    #[test]
    fn test_validation_message() {
        let err = AppError::from(ValidationError::BlankField("title"));
        assert_eq!(err.to_string(), "Invalid input: title must not be blank");
    }
}
