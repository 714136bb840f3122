//! Error types for the nfe-core library.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::extract::ContentType;

/// Main error type for the nfe library.
#[derive(Error, Debug)]
pub enum NfeError {
    /// No parser is registered for the source host / content type pair.
    #[error("no parser registered for host '{host}' with content type {content_type}")]
    UnsupportedSource {
        host: String,
        content_type: ContentType,
    },

    /// A text fragment could not be converted to its typed value.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// An extracted value failed a structural validation rule.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The declared document total does not match the summed item totals.
    #[error("document total {declared} does not match items total {computed}")]
    Reconciliation { declared: Decimal, computed: Decimal },

    /// The receipt URL is malformed or missing the access key parameter.
    #[error("invalid receipt URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Errors raised while converting raw text fragments to typed values.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The fragment is not a decimal amount.
    #[error("cannot convert '{0}' to a decimal amount")]
    Decimal(String),

    /// The fragment is not a DD/MM/YYYY HH:MM:SS timestamp, or the
    /// local time does not exist in the source time zone.
    #[error("cannot convert '{0}' to a date")]
    Date(String),

    /// A fragment the template is expected to carry was not found.
    #[error("expected fragment not found: {0}")]
    MissingFragment(String),
}

/// Errors raised when an extracted value fails validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// National registration code (CNPJ) does not match NN.NNN.NNN/NNNN-NN.
    #[error("national registration code '{0}' does not match NN.NNN.NNN/NNNN-NN")]
    NationalRegistration(String),

    /// State registration code is not a plain digit run.
    #[error("state registration code '{0}' is not numeric")]
    StateRegistration(String),

    /// The issuer address did not split into one of the two known shapes.
    #[error("address '{text}' split into {parts} parts, expected 5 or 6")]
    AddressShape { text: String, parts: usize },

    /// Payment description matched none of the known vocabulary.
    #[error("'{0}' is not a recognized payment type")]
    PaymentType(String),
}

/// Result type for the nfe library.
pub type Result<T> = std::result::Result<T, NfeError>;
