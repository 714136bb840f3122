//! Parser for the legacy SEFAZ-RS template.
//!
//! The old portal renders the receipt as flat tables whose cells are
//! tagged with `NFCCabecalho_*` style classes and label-prefixed text
//! ("Data de Emissão:", "Valor total R$", ...). Fields are located by
//! scanning `<td>` cells for their labels and walking to positional
//! siblings, mirroring the layout exactly; any structural drift fails
//! the whole document.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

use super::patterns::{
    ADDRESS_PLACEHOLDER_SEGMENT, NATIONAL_REGISTRATION, STATE_REGISTRATION,
};
use super::{text_of, value};
use crate::error::{ConversionError, NfeError, Result, ValidationError};
use crate::models::{Address, Nfe, NfeConsumer, NfeIssuer, NfeItem, PaymentType};

lazy_static! {
    static ref SUBTITLE: Selector = Selector::parse(".NFCCabecalho_SubTitulo").unwrap();
    static ref SUBTITLE1: Selector = Selector::parse(".NFCCabecalho_SubTitulo1").unwrap();
    static ref TD: Selector = Selector::parse("td").unwrap();
    static ref ITEM_ROW: Selector = Selector::parse(r#"tr[id^="Item"]"#).unwrap();
}

pub(super) fn parse(raw_html: &str) -> Result<Nfe> {
    let doc = Html::parse_document(raw_html);

    let issuer = parse_issuer(&doc)?;
    let consumer = parse_consumer(&doc)?;
    let issued_date = parse_issued_date(&doc)?;
    let access_key = parse_access_key(&doc)?;
    let total_amount = parse_total_amount(&doc)?;
    let total_discounts = parse_total_discounts(&doc)?;
    let payment_type = parse_payment_type(&doc)?;
    let items = parse_items(&doc)?;

    super::reconcile(total_amount, &items)?;

    Ok(Nfe {
        issuer,
        consumer,
        issued_date,
        access_key,
        total_amount,
        total_discounts,
        payment_type,
        items,
        raw_html: raw_html.to_string(),
    })
}

fn missing(what: &str) -> NfeError {
    ConversionError::MissingFragment(what.to_string()).into()
}

/// Every `<td>` whose subtree text contains `label`, in document order.
fn cells_containing<'a>(doc: &'a Html, label: &str) -> Vec<ElementRef<'a>> {
    doc.select(&TD)
        .filter(|cell| text_of(*cell).contains(label))
        .collect()
}

/// Climb `levels` element ancestors (td -> tr -> row group).
fn ancestor(element: ElementRef<'_>, levels: usize) -> Option<ElementRef<'_>> {
    let mut current = element;
    for _ in 0..levels {
        current = current.parent().and_then(ElementRef::wrap)?;
    }
    Some(current)
}

fn parse_issuer(doc: &Html) -> Result<NfeIssuer> {
    let name = doc
        .select(&SUBTITLE)
        .next()
        .ok_or_else(|| missing("issuer name heading"))?;
    let registration = doc
        .select(&SUBTITLE1)
        .next()
        .ok_or_else(|| missing("issuer registration line"))?;

    // "CNPJ: <code> Inscrição Estadual: <code>" - five positional tokens.
    let line = text_of(registration);
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [_, national, _, _, state] = tokens.as_slice() else {
        return Err(missing("issuer registration tokens"));
    };

    if !NATIONAL_REGISTRATION.is_match(national) {
        return Err(ValidationError::NationalRegistration(national.to_string()).into());
    }
    if !STATE_REGISTRATION.is_match(state) {
        return Err(ValidationError::StateRegistration(state.to_string()).into());
    }

    Ok(NfeIssuer {
        name: value::normalize(&text_of(name)),
        national_registration_code: national.to_string(),
        state_registration_code: Some(state.to_string()),
        address: parse_address(doc)?,
    })
}

fn parse_address(doc: &Html) -> Result<Address> {
    let element = doc
        .select(&SUBTITLE1)
        .last()
        .ok_or_else(|| missing("issuer address line"))?;

    // Some stores publish ", 0," as a placeholder street number.
    let text = text_of(element).replace('\n', "");
    let text = ADDRESS_PLACEHOLDER_SEGMENT.replace_all(&text, ",");

    let parts: Vec<&str> = text.split(',').collect();
    let [street, number, neighborhood, city, state] = parts.as_slice() else {
        return Err(ValidationError::AddressShape {
            text: value::normalize(&text),
            parts: parts.len(),
        }
        .into());
    };

    Ok(Address {
        line1: value::normalize(&format!("{street} {number} {neighborhood}")),
        line2: None,
        city: value::normalize(city),
        state: value::normalize(state),
        country: "BR".to_string(),
        zip_code: None,
    })
}

fn parse_consumer(doc: &Html) -> Result<NfeConsumer> {
    let label = cells_containing(doc, "CONSUMIDOR")
        .pop()
        .ok_or_else(|| missing("consumer section"))?;
    let section = ancestor(label, 2).ok_or_else(|| missing("consumer section"))?;
    let cell = section
        .select(&TD)
        .last()
        .ok_or_else(|| missing("consumer identification cell"))?;

    Ok(NfeConsumer {
        identification: value::normalize(&text_of(cell).replace("CPF:", "")),
    })
}

fn parse_issued_date(doc: &Html) -> Result<DateTime<Utc>> {
    let cell = cells_containing(doc, "Data de Emissão:")
        .into_iter()
        .next()
        .ok_or_else(|| missing("issue date cell"))?;

    let text = text_of(cell);
    let after_label = text
        .split("Data de Emissão:")
        .nth(1)
        .ok_or_else(|| missing("issue date value"))?;
    let fragment = after_label.split('\n').next().unwrap_or_default();

    Ok(value::to_datetime(fragment)?)
}

/// Second cell of the row holding the given summary label.
fn labeled_row_amount(doc: &Html, label: &str) -> Result<Option<Decimal>> {
    let Some(cell) = cells_containing(doc, label).pop() else {
        return Ok(None);
    };
    let row = ancestor(cell, 1).ok_or_else(|| missing(label))?;
    let amount_cell = row
        .select(&TD)
        .nth(1)
        .ok_or_else(|| missing(label))?;

    Ok(Some(value::to_decimal(&text_of(amount_cell))?))
}

fn parse_total_amount(doc: &Html) -> Result<Decimal> {
    labeled_row_amount(doc, "Valor total R$")?.ok_or_else(|| missing("total amount row"))
}

fn parse_total_discounts(doc: &Html) -> Result<Decimal> {
    // The discounts row is optional; its absence means no discount.
    Ok(labeled_row_amount(doc, "Valor descontos R$")?.unwrap_or(Decimal::ZERO))
}

fn parse_payment_type(doc: &Html) -> Result<PaymentType> {
    let label = cells_containing(doc, "FORMA PAGAMENTO")
        .pop()
        .ok_or_else(|| missing("payment section"))?;
    let section = ancestor(label, 2).ok_or_else(|| missing("payment section"))?;

    // The description sits in the second-to-last cell of the payment
    // table, next to the paid amount.
    let cells: Vec<_> = section.select(&TD).collect();
    let description = cells
        .len()
        .checked_sub(2)
        .and_then(|index| cells.get(index))
        .ok_or_else(|| missing("payment description cell"))?;

    Ok(value::to_payment_type(&text_of(*description))?)
}

fn parse_access_key(doc: &Html) -> Result<String> {
    let label = cells_containing(doc, "CHAVE DE ACESSO")
        .pop()
        .ok_or_else(|| missing("access key label"))?;

    // The key lives in the next <td> in document order after its label.
    let mut seen_label = false;
    for cell in doc.select(&TD) {
        if seen_label {
            return Ok(value::normalize_compact(&text_of(cell)));
        }
        if cell.id() == label.id() {
            seen_label = true;
        }
    }
    Err(missing("access key cell"))
}

fn parse_items(doc: &Html) -> Result<Vec<NfeItem>> {
    let mut items = Vec::new();

    for row in doc.select(&ITEM_ROW) {
        let cells: Vec<_> = row.select(&TD).collect();
        let [code, description, quantity, unit, unitary_price, total_price, ..] =
            cells.as_slice()
        else {
            return Err(missing("item row cells"));
        };

        items.push(NfeItem {
            barcode: value::normalize(&text_of(*code)),
            description: value::normalize(&text_of(*description)),
            quantity: value::to_decimal(&text_of(*quantity))?,
            metric_unit: value::to_metric_unit(&text_of(*unit)),
            unitary_price: value::to_decimal(&text_of(*unitary_price))?,
            total_price: value::to_decimal(&text_of(*total_price))?,
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricUnit;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn fixture(cnpj: &str, total: &str) -> String {
        format!(
            r#"<html><body>
<table>
  <tr><td class="NFCCabecalho_SubTitulo">MERCADO  EXEMPLO LTDA</td></tr>
  <tr><td class="NFCCabecalho_SubTitulo1">CNPJ: {cnpj} Inscrição Estadual: 0962598556</td></tr>
  <tr><td class="NFCCabecalho_SubTitulo1">RUA DAS FLORES, 100, CENTRO, PORTO ALEGRE, RS</td></tr>
</table>
<table>
  <tr><td>Número: 123456 Série: 1 Data de Emissão: 15/03/2023 14:30:00
Protocolo: 999</td></tr>
</table>
<table>
  <tr><td>CONSUMIDOR</td></tr>
  <tr><td>CPF: 123.456.789-09</td></tr>
</table>
<table>
  <tr id="Item1"><td>7891234567890</td><td>FEIJAO  PRETO 1KG</td><td>1</td><td>UN</td><td>5,30</td><td>5,30</td></tr>
  <tr id="Item2"><td>7890000000017</td><td>QUEIJO COLONIAL</td><td>0,512</td><td>KG</td><td>14,65</td><td>7,50</td></tr>
</table>
<table>
  <tr><td>Qtd. total de itens</td><td>2</td></tr>
  <tr><td>Valor total R$</td><td>{total}</td></tr>
  <tr><td>Valor descontos R$</td><td>0,00</td></tr>
</table>
<table>
  <tr><td>FORMA PAGAMENTO</td><td>VALOR PAGO R$</td></tr>
  <tr><td>Dinheiro</td><td>12,80</td></tr>
</table>
<table>
  <tr><td>CHAVE DE ACESSO</td></tr>
  <tr><td>4323 0312 3456 7800 0199 5500 1000 1234 5612 3456 7890</td></tr>
</table>
</body></html>"#
        )
    }

    #[test]
    fn parses_a_full_document() {
        let html = fixture("12.345.678/0001-99", "12,80");
        let nfe = parse(&html).unwrap();

        assert_eq!(nfe.issuer.name, "MERCADO EXEMPLO LTDA");
        assert_eq!(nfe.issuer.national_registration_code, "12.345.678/0001-99");
        assert_eq!(
            nfe.issuer.state_registration_code.as_deref(),
            Some("0962598556")
        );
        assert_eq!(nfe.issuer.address.line1, "RUA DAS FLORES 100 CENTRO");
        assert_eq!(nfe.issuer.address.city, "PORTO ALEGRE");
        assert_eq!(nfe.issuer.address.state, "RS");
        assert_eq!(nfe.issuer.address.country, "BR");

        assert_eq!(nfe.consumer.identification, "123.456.789-09");
        assert_eq!(
            nfe.issued_date,
            Utc.with_ymd_and_hms(2023, 3, 15, 17, 30, 0).unwrap()
        );
        assert_eq!(
            nfe.access_key,
            "43230312345678000199550010001234561234567890"
        );
        assert_eq!(nfe.total_amount, Decimal::from_str("12.80").unwrap());
        assert_eq!(nfe.total_discounts, Decimal::from_str("0.00").unwrap());
        assert_eq!(nfe.payment_type, PaymentType::Money);

        assert_eq!(nfe.items.len(), 2);
        assert_eq!(nfe.items[0].description, "FEIJAO PRETO 1KG");
        assert_eq!(nfe.items[0].metric_unit, MetricUnit::Unit);
        assert_eq!(nfe.items[1].barcode, "7890000000017");
        assert_eq!(nfe.items[1].metric_unit, MetricUnit::Kg);
        assert_eq!(nfe.items[1].quantity, Decimal::from_str("0.512").unwrap());
        assert_eq!(
            nfe.items[1].unitary_price,
            Decimal::from_str("14.65").unwrap()
        );
        assert_eq!(nfe.items_total(), nfe.total_amount);
    }

    #[test]
    fn parsing_is_idempotent() {
        let html = fixture("12.345.678/0001-99", "12,80");
        let first = parse(&html).unwrap();
        let second = parse(&html).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn mismatched_total_fails_reconciliation() {
        let html = fixture("12.345.678/0001-99", "13,00");
        let err = parse(&html).unwrap_err();
        match err {
            NfeError::Reconciliation { declared, computed } => {
                assert_eq!(declared, Decimal::from_str("13.00").unwrap());
                assert_eq!(computed, Decimal::from_str("12.80").unwrap());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unpunctuated_tax_id_fails_validation() {
        let html = fixture("12345678000199", "12,80");
        let err = parse(&html).unwrap_err();
        assert!(matches!(
            err,
            NfeError::Validation(ValidationError::NationalRegistration(_))
        ));
    }

    #[test]
    fn missing_discount_row_defaults_to_zero() {
        let html = fixture("12.345.678/0001-99", "12,80")
            .replace("<tr><td>Valor descontos R$</td><td>0,00</td></tr>", "");
        let nfe = parse(&html).unwrap();
        assert_eq!(nfe.total_discounts, Decimal::ZERO);
    }

    #[test]
    fn placeholder_address_segment_is_scrubbed() {
        let html = fixture("12.345.678/0001-99", "12,80").replace(
            "RUA DAS FLORES, 100, CENTRO, PORTO ALEGRE, RS",
            "AV BRASIL, 1500, 0, SAO GERALDO, PORTO ALEGRE, RS",
        );
        let nfe = parse(&html).unwrap();
        assert_eq!(nfe.issuer.address.line1, "AV BRASIL 1500 SAO GERALDO");
    }

    #[test]
    fn malformed_address_fails_validation() {
        let html = fixture("12.345.678/0001-99", "12,80").replace(
            "RUA DAS FLORES, 100, CENTRO, PORTO ALEGRE, RS",
            "RUA DAS FLORES, 100, PORTO ALEGRE, RS",
        );
        let err = parse(&html).unwrap_err();
        assert!(matches!(
            err,
            NfeError::Validation(ValidationError::AddressShape { parts: 4, .. })
        ));
    }
}
