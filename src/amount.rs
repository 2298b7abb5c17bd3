//! Positive money amounts.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation::FieldError;

/// The largest amount accepted for a transaction or budget.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// An amount of money greater than zero.
///
/// Stored as text so that no precision is lost in the database. Whether the
/// money was earned or spent is recorded separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    /// Create and validate an amount.
    ///
    /// # Errors
    /// Returns an error if `amount` is missing, zero, negative or larger
    /// than [MAX_AMOUNT].
    pub fn new(amount: Option<Decimal>) -> Result<Self, FieldError> {
        match amount {
            None => Err(FieldError::new("Amount is required")),
            Some(amount) if amount <= Decimal::ZERO => {
                Err(FieldError::new("Amount must be greater than zero"))
            }
            Some(amount) if amount > MAX_AMOUNT => Err(FieldError::new(format!(
                "Amount must be at most {MAX_AMOUNT}"
            ))),
            Some(amount) => Ok(Self(amount.normalize())),
        }
    }

    /// Create an amount without validation.
    pub fn new_unchecked(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The amount as a decimal.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        Decimal::from_str(text)
            .map(Self)
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

#[cfg(test)]
mod amount_tests {
    use rust_decimal::Decimal;

    use super::{Amount, MAX_AMOUNT};

    #[test]
    fn rejects_missing_zero_and_negative() {
        assert!(Amount::new(None).is_err());
        assert!(Amount::new(Some(Decimal::ZERO)).is_err());
        assert!(Amount::new(Some(Decimal::new(-150, 2))).is_err());
    }

    #[test]
    fn max_amount_is_just_under_a_trillion() {
        assert_eq!(MAX_AMOUNT, Decimal::new(99_999_999_999_999, 2));
    }

    #[test]
    fn rejects_amounts_over_the_maximum() {
        assert!(Amount::new(Some(MAX_AMOUNT)).is_ok());
        assert!(Amount::new(Some(MAX_AMOUNT + Decimal::new(1, 2))).is_err());
        assert!(Amount::new(Some(Decimal::from_i128_with_scale(10_i128.pow(27), 0))).is_err());
    }

    #[test]
    fn json_numbers_keep_every_digit() {
        let amount: Amount = serde_json::from_str("12345678901234567.89").unwrap();

        assert_eq!(
            amount.value(),
            Decimal::from_i128_with_scale(1_234_567_890_123_456_789, 2)
        );
        assert_eq!(serde_json::to_string(&amount).unwrap(), "12345678901234567.89");
    }

    #[test]
    fn accepts_positive() {
        assert_eq!(
            Amount::new(Some(Decimal::new(1230, 2))).unwrap().value(),
            Decimal::new(123, 1)
        );
    }

    #[test]
    fn round_trips_through_sqlite_text() {
        let connection = rusqlite::Connection::open_in_memory().unwrap();
        let amount = Amount::new_unchecked(Decimal::new(12345678, 4));

        let stored: Amount = connection
            .query_row("SELECT ?1", [amount], |row| row.get(0))
            .unwrap();

        assert_eq!(stored, amount);
    }
}
