use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{validation_error, Error};

/// Rounds a submitted amount to paise and rejects negatives.
pub fn validate_amount(field: &str, amount: Decimal) -> Result<Decimal, Error> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(validation_error(format!("{} must not be negative", field)));
    }

    Ok(amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Fallback for amounts read back from storage. Rows written before amounts
/// were validated may hold strings, nulls or negative numbers; those read as
/// zero so the booking stays displayable.
pub fn coerce_amount(value: &Value) -> Decimal {
    let parsed = match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    };

    match parsed {
        Some(amount) if !amount.is_sign_negative() || amount.is_zero() => amount,
        _ => {
            tracing::warn!(?value, "malformed stored amount, reading as zero");
            Decimal::ZERO
        }
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;

    Ok(coerce_amount(&value))
}

#[test]
fn validate_amount_test() {
    let amount = validate_amount("price", Decimal::new(12345, 3)).unwrap();
    assert_eq!(amount, Decimal::new(1235, 2));

    let amount = validate_amount("price", Decimal::ZERO).unwrap();
    assert_eq!(amount, Decimal::ZERO);

    let err = validate_amount("price", Decimal::new(-1, 0)).unwrap_err();
    assert!(err.is_validation_error());
}

#[test]
fn coerce_amount_test() {
    use serde_json::json;

    assert_eq!(coerce_amount(&json!("1500.50")), Decimal::new(150050, 2));
    assert_eq!(coerce_amount(&json!(" 42 ")), Decimal::new(42, 0));
    assert_eq!(coerce_amount(&json!(99.5)), Decimal::new(995, 1));
    assert_eq!(coerce_amount(&json!(7)), Decimal::new(7, 0));

    assert_eq!(coerce_amount(&json!("")), Decimal::ZERO);
    assert_eq!(coerce_amount(&json!("abc")), Decimal::ZERO);
    assert_eq!(coerce_amount(&json!(null)), Decimal::ZERO);
    assert_eq!(coerce_amount(&json!({"amount": 1})), Decimal::ZERO);
    assert_eq!(coerce_amount(&json!("-20")), Decimal::ZERO);
}
