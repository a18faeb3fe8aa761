//! Validation utilities for the Reseller Ledger platform

use rust_decimal::Decimal;

use crate::models::OrderLine;

// ============================================================================
// Ledger Validations
// ============================================================================

/// Money is stored as NUMERIC(15, 2)
const MONEY_SCALE: u32 = 2;

fn has_cents_precision(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

/// Validate that a monetary amount is strictly positive, in whole cents
pub fn validate_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero");
    }
    if !has_cents_precision(amount) {
        return Err("Amount cannot have more than 2 decimal places");
    }
    Ok(())
}

/// Validate that an opening balance is not negative
pub fn validate_initial_balance(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Initial balance cannot be negative");
    }
    if !has_cents_precision(amount) {
        return Err("Initial balance cannot have more than 2 decimal places");
    }
    Ok(())
}

/// Validate that a price is not negative
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    if !has_cents_precision(price) {
        return Err("Price cannot have more than 2 decimal places");
    }
    Ok(())
}

/// Validate an ordered or restocked quantity
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate the lines of a new order
pub fn validate_order_lines(lines: &[OrderLine]) -> Result<(), &'static str> {
    if lines.is_empty() {
        return Err("Order must contain at least one item");
    }
    for line in lines {
        validate_quantity(line.quantity)?;
    }
    Ok(())
}

/// Validate a stock level entered on the catalog
pub fn validate_stock_level(stock: i32) -> Result<(), &'static str> {
    if stock < 0 {
        return Err("Stock cannot be negative");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate phone number format
/// Accepts: 081234567890, +62 812-3456-7890, (021) 555-0199
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let trimmed = phone.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'))
    {
        return Err("Phone number may only contain digits, spaces, dashes and parentheses");
    }

    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if !(10..=15).contains(&digits) {
        return Err("Phone number must have 10 to 15 digits");
    }
    Ok(())
}

/// Validate SKU format (2-32 uppercase alphanumeric characters or dashes)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.len() < 2 {
        return Err("SKU must be at least 2 characters");
    }
    if sku.len() > 32 {
        return Err("SKU must be at most 32 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("SKU must be uppercase alphanumeric with dashes only");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 6 {
        return Err("Password must be at least 6 characters");
    }
    Ok(())
}
