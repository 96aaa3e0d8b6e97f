use thiserror::Error;

use super::{Cents, MAX_AMOUNT_CENTS, format_cents};

/// Input that was well-formed JSON (or CLI arguments) but breaks a field rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be blank")]
    BlankField(&'static str),

    #[error("{field} must not be negative (got {value})")]
    NegativeAmount { field: &'static str, value: Cents },

    #[error("{field} must be greater than zero (got {value})")]
    NonPositiveAmount { field: &'static str, value: Cents },

    #[error("{field} must not exceed {} (got {value})", format_cents(MAX_AMOUNT_CENTS))]
    AmountTooLarge { field: &'static str, value: Cents },

    #[error("nothing to update")]
    EmptyUpdate,
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &'static str, value: Cents) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::NegativeAmount { field, value });
    }
    require_bounded(field, value)
}

pub(crate) fn require_positive(field: &'static str, value: Cents) -> Result<(), ValidationError> {
    if value <= 0 {
        return Err(ValidationError::NonPositiveAmount { field, value });
    }
    require_bounded(field, value)
}

fn require_bounded(field: &'static str, value: Cents) -> Result<(), ValidationError> {
    if value > MAX_AMOUNT_CENTS {
        return Err(ValidationError::AmountTooLarge { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_bounds() {
        assert!(require_non_negative("totalAmount", 0).is_ok());
        assert!(require_non_negative("totalAmount", MAX_AMOUNT_CENTS).is_ok());
        assert!(require_positive("amount", MAX_AMOUNT_CENTS).is_ok());
        assert_eq!(
            require_non_negative("totalAmount", MAX_AMOUNT_CENTS + 1),
            Err(ValidationError::AmountTooLarge {
                field: "totalAmount",
                value: MAX_AMOUNT_CENTS + 1,
            })
        );
        assert_eq!(
            require_positive("amount", i64::MAX),
            Err(ValidationError::AmountTooLarge {
                field: "amount",
                value: i64::MAX,
            })
        );
    }
}
