//! NFC-e document models.
//!
//! Every entity is built once during a single parse call and never
//! mutated afterwards; the record owns its items and sub-records.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Postal address of the issuing store.
///
/// The portal only publishes a free-text blob, so `line1` carries
/// street, number and neighborhood joined together. `zip_code` is
/// usually absent from the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

/// The store that issued the receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfeIssuer {
    pub name: String,

    /// CNPJ, always in the punctuated NN.NNN.NNN/NNNN-NN form.
    pub national_registration_code: String,

    /// State tax registration, digits only. The newer portal template
    /// does not publish it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_registration_code: Option<String>,

    pub address: Address,
}

/// The consumer as identified on the receipt, or a "not identified"
/// marker. No format is enforced; the content varies by document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfeConsumer {
    pub identification: String,
}

/// Unit of measure for a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricUnit {
    Kg,
    Unit,
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricUnit::Kg => write!(f, "KG"),
            MetricUnit::Unit => write!(f, "UNIT"),
        }
    }
}

/// How the receipt was paid.
///
/// `StoreCard` is part of the portal vocabulary but no template rule
/// produces it yet; an unmatched payment description is a fatal
/// validation error rather than a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    CreditCard,
    DebitCard,
    Money,
    FoodVoucher,
    StoreCard,
    Other,
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentType::CreditCard => "CREDIT_CARD",
            PaymentType::DebitCard => "DEBIT_CARD",
            PaymentType::Money => "MONEY",
            PaymentType::FoodVoucher => "FOOD_VOUCHER",
            PaymentType::StoreCard => "STORE_CARD",
            PaymentType::Other => "OTHER",
        };
        write!(f, "{label}")
    }
}

/// A single line item on the receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfeItem {
    pub barcode: String,
    pub description: String,
    pub quantity: Decimal,
    pub metric_unit: MetricUnit,
    pub unitary_price: Decimal,
    pub total_price: Decimal,
}

impl fmt::Display for NfeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} {} * {} = R${})",
            self.description, self.quantity, self.metric_unit, self.unitary_price, self.total_price
        )
    }
}

/// A fully extracted NFC-e document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nfe {
    pub issuer: NfeIssuer,
    pub consumer: NfeConsumer,

    /// Issue instant, normalized from America/Sao_Paulo to UTC.
    pub issued_date: DateTime<Utc>,

    /// 44-digit fiscal access key, carried opaquely as text. Natural
    /// key of the document; the checksum is not validated here.
    pub access_key: String,

    pub total_amount: Decimal,
    pub total_discounts: Decimal,
    pub payment_type: PaymentType,
    pub items: Vec<NfeItem>,

    /// Original markup, retained for audit and debugging.
    pub raw_html: String,
}

impl Nfe {
    /// Sum of the line item totals. Equal to `total_amount` for every
    /// record that survives extraction.
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(|item| item.total_price).sum()
    }
}

impl fmt::Display for Nfe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Access Key: {}", self.access_key)?;
        writeln!(f, "Issuer: {}", self.issuer.name)?;
        writeln!(f, "Date: {}", self.issued_date)?;
        writeln!(f, "Consumer: {}", self.consumer.identification)?;
        writeln!(f, "Total Amount: {}", self.total_amount)?;
        writeln!(f, "Total Discounts: {}", self.total_discounts)?;
        writeln!(f, "Payment Type: {}", self.payment_type)?;
        for item in &self.items {
            writeln!(f, "{item}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn item(total: &str) -> NfeItem {
        NfeItem {
            barcode: "7891234567890".to_string(),
            description: "FEIJAO PRETO 1KG".to_string(),
            quantity: Decimal::ONE,
            metric_unit: MetricUnit::Unit,
            unitary_price: Decimal::from_str(total).unwrap(),
            total_price: Decimal::from_str(total).unwrap(),
        }
    }

    #[test]
    fn items_total_sums_line_totals() {
        let nfe = Nfe {
            issuer: NfeIssuer {
                name: "MERCADO EXEMPLO LTDA".to_string(),
                national_registration_code: "12.345.678/0001-99".to_string(),
                state_registration_code: None,
                address: Address {
                    line1: "RUA DAS FLORES 100 CENTRO".to_string(),
                    line2: None,
                    city: "PORTO ALEGRE".to_string(),
                    state: "RS".to_string(),
                    country: "BR".to_string(),
                    zip_code: None,
                },
            },
            consumer: NfeConsumer {
                identification: "CONSUMIDOR NAO IDENTIFICADO".to_string(),
            },
            issued_date: Utc::now(),
            access_key: "4".repeat(44),
            total_amount: Decimal::from_str("12.80").unwrap(),
            total_discounts: Decimal::ZERO,
            payment_type: PaymentType::Money,
            items: vec![item("5.30"), item("7.50")],
            raw_html: String::new(),
        };

        assert_eq!(nfe.items_total(), Decimal::from_str("12.80").unwrap());
    }

    #[test]
    fn payment_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&PaymentType::FoodVoucher).unwrap();
        assert_eq!(json, "\"FOOD_VOUCHER\"");
        assert_eq!(PaymentType::StoreCard.to_string(), "STORE_CARD");
    }

    #[test]
    fn metric_unit_display() {
        assert_eq!(MetricUnit::Kg.to_string(), "KG");
        assert_eq!(MetricUnit::Unit.to_string(), "UNIT");
    }
}
