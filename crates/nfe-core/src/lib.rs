//! Core library for Brazilian NFC-e receipt scraping.
//!
//! This crate provides:
//! - Receipt URL validation (host + access key extraction)
//! - Template parser selection for the two known SEFAZ-RS layouts
//! - HTML field extraction into typed, immutable receipt records
//! - Value conversion (locale decimals, local timestamps, metric units)
//!
//! Fetching and rendering live with the callers; parsing itself is
//! synchronous, stateless and safe to run from independent workers.

pub mod error;
pub mod extract;
pub mod models;
pub mod source;

pub use error::{ConversionError, NfeError, Result, ValidationError};
pub use extract::{ContentType, TemplateFamily, parse_nfe};
pub use models::{Address, MetricUnit, Nfe, NfeConsumer, NfeIssuer, NfeItem, PaymentType};
pub use source::NfeUrl;
