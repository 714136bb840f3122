//! Value conversion for raw text fragments.
//!
//! Every fragment lifted out of the markup goes through [`normalize`]
//! first; the typed conversions then turn the cleaned text into exact
//! decimals, UTC instants, metric units or payment types.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::America::Sao_Paulo;
use rust_decimal::Decimal;
use tracing::warn;

use super::patterns::{CREDIT_CARD, DEBIT_CARD, FOOD_VOUCHER, MONEY, OTHER_PAYMENT};
use crate::error::{ConversionError, ValidationError};
use crate::models::{MetricUnit, PaymentType};

/// Unit tokens that historically mean "counted item"; anything outside
/// this list also falls back to [`MetricUnit::Unit`], with a warning.
const UNIT_TOKENS: [&str; 7] = ["UN", "UNID", "EX", "AVULSO", "POTE", "CAIXA", "FRASCO"];

/// Collapse whitespace runs (spaces, tabs, newlines) to a single space
/// and trim both ends.
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip all whitespace. Used for codes and access keys.
pub fn normalize_compact(raw: &str) -> String {
    raw.split_whitespace().collect()
}

/// Convert a locale-formatted amount ("R$ 1.234,56") to an exact
/// decimal. Every character that is not a digit or the comma decimal
/// separator is dropped, so thousands separators cannot shift the
/// value.
pub fn to_decimal(raw: &str) -> Result<Decimal, ConversionError> {
    let sanitized: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect::<String>()
        .replace(',', ".");

    if sanitized.is_empty() {
        return Err(ConversionError::Decimal(normalize(raw)));
    }

    Decimal::from_str(&sanitized).map_err(|_| ConversionError::Decimal(normalize(raw)))
}

/// Parse a `DD/MM/YYYY HH:MM:SS` timestamp, interpret it in the
/// portal's America/Sao_Paulo zone and convert to UTC.
pub fn to_datetime(raw: &str) -> Result<DateTime<Utc>, ConversionError> {
    let text = normalize(raw);
    let naive = NaiveDateTime::parse_from_str(&text, "%d/%m/%Y %H:%M:%S")
        .map_err(|_| ConversionError::Date(text.clone()))?;

    Sao_Paulo
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or(ConversionError::Date(text))
}

/// Convert a unit token to a metric unit. Unrecognized tokens default
/// to [`MetricUnit::Unit`] with a warning; unit spellings are too
/// inconsistent across documents to treat as fatal.
pub fn to_metric_unit(raw: &str) -> MetricUnit {
    let token = normalize(raw).to_uppercase();
    if token == "KG" || token == "KG0001" {
        return MetricUnit::Kg;
    }
    if !UNIT_TOKENS.contains(&token.as_str()) {
        warn!(unit = %token, "unit not recognized, falling back to UNIT");
    }
    MetricUnit::Unit
}

/// Classify a payment description into the closed payment vocabulary.
/// Unmatched text is fatal: it signals either a new payment method or
/// a parser locating the wrong cell.
pub fn to_payment_type(raw: &str) -> Result<PaymentType, ValidationError> {
    let text = normalize(raw);

    if CREDIT_CARD.is_match(&text) {
        Ok(PaymentType::CreditCard)
    } else if DEBIT_CARD.is_match(&text) {
        Ok(PaymentType::DebitCard)
    } else if MONEY.is_match(&text) {
        Ok(PaymentType::Money)
    } else if FOOD_VOUCHER.is_match(&text) {
        Ok(PaymentType::FoodVoucher)
    } else if OTHER_PAYMENT.is_match(&text) {
        Ok(PaymentType::Other)
    } else {
        Err(ValidationError::PaymentType(text))
    }
}
