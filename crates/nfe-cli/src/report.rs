//! Report rendering for extracted receipts.

use nfe_core::Nfe;
use rust_decimal::Decimal;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text summary
    Text,
    /// JSON output
    Json,
    /// CSV output, one row per line item
    Csv,
}

pub fn render(nfes: &[Nfe], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(nfes)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(nfes)?),
        OutputFormat::Csv => render_csv(nfes),
    }
}

fn render_text(nfes: &[Nfe]) -> String {
    let mut output = String::new();

    output.push_str(&format!("{0} RESULT {0}\n", "=".repeat(25)));
    for nfe in nfes {
        output.push_str(&nfe.to_string());
        output.push_str(&"-".repeat(50));
        output.push('\n');
    }

    output
}

fn render_csv(nfes: &[Nfe]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "issued_date",
        "issuer",
        "nfe_total",
        "barcode",
        "description",
        "quantity",
        "metric_unit",
        "unitary_price",
        "total_price",
    ])?;

    for nfe in nfes {
        for item in &nfe.items {
            wtr.write_record([
                &nfe.issued_date.to_rfc3339(),
                &nfe.issuer.name,
                &l10n_decimal(&nfe.total_amount),
                &item.barcode,
                &item.description,
                &l10n_decimal(&item.quantity),
                &item.metric_unit.to_string(),
                &l10n_decimal(&item.unitary_price),
                &l10n_decimal(&item.total_price),
            ])?;
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

/// Decimal in the pt-BR convention, comma as the decimal mark.
fn l10n_decimal(value: &Decimal) -> String {
    value.to_string().replace('.', ",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use nfe_core::{Address, MetricUnit, NfeConsumer, NfeIssuer, NfeItem, PaymentType};
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn sample() -> Nfe {
        Nfe {
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
            issued_date: Utc.with_ymd_and_hms(2023, 3, 10, 17, 30, 0).unwrap(),
            access_key: "4".repeat(44),
            total_amount: Decimal::from_str("12.80").unwrap(),
            total_discounts: Decimal::ZERO,
            payment_type: PaymentType::Money,
            items: vec![
                NfeItem {
                    barcode: "7891234567890".to_string(),
                    description: "FEIJAO PRETO 1KG".to_string(),
                    quantity: Decimal::ONE,
                    metric_unit: MetricUnit::Unit,
                    unitary_price: Decimal::from_str("5.30").unwrap(),
                    total_price: Decimal::from_str("5.30").unwrap(),
                },
                NfeItem {
                    barcode: "2000001000512".to_string(),
                    description: "TOMATE".to_string(),
                    quantity: Decimal::from_str("0.512").unwrap(),
                    metric_unit: MetricUnit::Kg,
                    unitary_price: Decimal::from_str("14.65").unwrap(),
                    total_price: Decimal::from_str("7.50").unwrap(),
                },
            ],
            raw_html: String::new(),
        }
    }

    #[test]
    fn text_report_lists_every_receipt() {
        let text = render_text(&[sample()]);
        assert!(text.starts_with(&format!("{0} RESULT {0}", "=".repeat(25))));
        assert!(text.contains("Issuer: MERCADO EXEMPLO LTDA"));
        assert!(text.contains("Payment Type: MONEY"));
        assert!(text.contains(&"-".repeat(50)));
    }

    #[test]
    fn csv_report_has_one_row_per_item() {
        let csv = render_csv(&[sample()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("12,80"));
        assert!(lines[2].contains("0,512"));
        assert!(lines[2].contains("KG"));
    }

    #[test]
    fn json_report_round_trips() {
        let json = render(&[sample()], OutputFormat::Json).unwrap();
        let parsed: Vec<Nfe> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, vec![sample()]);
    }
}
