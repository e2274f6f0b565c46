//! Money rules for the table ledger
//!
//! Every amount is a `Decimal` rounded to cents with half-away-from-zero.
//! Inputs carrying more than two decimal places are rejected rather than
//! silently rounded, so the ledger never stores an amount the client did
//! not send.

use super::error::{LedgerError, LedgerResult};
use rust_decimal::prelude::*;
use shared::sitting::DishInput;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed unit/extra price per dish (1,000,000)
const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
/// Maximum allowed quantity per dish
const MAX_QUANTITY: i32 = 9999;
/// Maximum allowed single payment (1,000,000)
const MAX_PAYMENT_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
/// Maximum number of people in one split
pub const MAX_SPLIT_PEOPLE: u32 = 100;

/// Round to cents
#[inline]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// quantity × (unit_price + extra_price), rounded to cents
pub fn line_total(quantity: i32, unit_price: Decimal, extra_price: Decimal) -> Decimal {
    round2(Decimal::from(quantity) * (unit_price + extra_price))
}

/// Split an amount into `n` equal shares, rounded to cents
pub fn per_person(amount: Decimal, n: usize) -> Decimal {
    if n == 0 {
        return Decimal::ZERO;
    }
    round2(amount / Decimal::from(n as u64))
}

fn require_cents(value: Decimal, field_name: &str) -> LedgerResult<()> {
    if value.normalize().scale() > DECIMAL_PLACES {
        return Err(LedgerError::Validation(format!(
            "{} must have at most {} decimal places, got {}",
            field_name, DECIMAL_PLACES, value
        )));
    }
    Ok(())
}

fn require_price(value: Decimal, field_name: &str) -> LedgerResult<()> {
    require_cents(value, field_name)?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(LedgerError::Validation(format!(
            "{} must be non-negative, got {}",
            field_name, value
        )));
    }
    if value > MAX_PRICE {
        return Err(LedgerError::Validation(format!(
            "{} exceeds maximum allowed ({}), got {}",
            field_name, MAX_PRICE, value
        )));
    }
    Ok(())
}

/// Validate a dish order before it reaches the ledger
pub fn validate_dish_input(dish: &DishInput) -> LedgerResult<()> {
    if dish.item_name.trim().is_empty() {
        return Err(LedgerError::Validation("item_name must not be empty".into()));
    }

    if dish.quantity <= 0 {
        return Err(LedgerError::Validation(format!(
            "quantity must be positive, got {}",
            dish.quantity
        )));
    }
    if dish.quantity > MAX_QUANTITY {
        return Err(LedgerError::Validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, dish.quantity
        )));
    }

    require_price(dish.unit_price, "unit_price")?;
    require_price(dish.extra_price, "extra_price")?;
    Ok(())
}

/// Validate a free payment amount
pub fn validate_payment_amount(amount: Decimal) -> LedgerResult<()> {
    require_cents(amount, "payment amount")?;
    if amount <= Decimal::ZERO {
        return Err(LedgerError::Validation(format!(
            "payment amount must be positive, got {}",
            amount
        )));
    }
    if amount > MAX_PAYMENT_AMOUNT {
        return Err(LedgerError::Validation(format!(
            "payment amount exceeds maximum allowed ({}), got {}",
            MAX_PAYMENT_AMOUNT, amount
        )));
    }
    Ok(())
}

/// Validate the head count of a split
pub fn validate_split_people(number_of_people: u32) -> LedgerResult<()> {
    if number_of_people == 0 || number_of_people > MAX_SPLIT_PEOPLE {
        return Err(LedgerError::Validation(format!(
            "number_of_people must be between 1 and {}, got {}",
            MAX_SPLIT_PEOPLE, number_of_people
        )));
    }
    Ok(())
}
