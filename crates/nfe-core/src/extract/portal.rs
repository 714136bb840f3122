//! Parser for the newer dfe-portal SEFAZ-RS template.
//!
//! The portal rewrite replaced the flat tables with semantic
//! containers: the issuer block is a `.txtCenter` div with one child
//! per line, summary rows carry `id="linhaTotal"` / `id="linhaForma"`,
//! and item rows pack their fields into nested `<span>` runs whose
//! numeric substrings have to be regex-extracted. Only the item-row
//! `tr[id^=Item]` convention survived from the legacy layout.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

use super::patterns::{
    ADDRESS_BLANK_SEGMENT, AMOUNT, DATE_TIME, DIGITS, NATIONAL_REGISTRATION,
};
use super::{text_of, value};
use crate::error::{ConversionError, NfeError, Result, ValidationError};
use crate::models::{Address, Nfe, NfeConsumer, NfeIssuer, NfeItem, PaymentType};

lazy_static! {
    static ref ISSUER_CONTAINER: Selector = Selector::parse(".txtCenter").unwrap();
    static ref HEADING: Selector = Selector::parse("h4").unwrap();
    static ref BOLD: Selector = Selector::parse("strong").unwrap();
    static ref TOTAL_ROW: Selector = Selector::parse("#linhaTotal").unwrap();
    static ref PAYMENT_ROW: Selector = Selector::parse("#linhaForma").unwrap();
    static ref ACCESS_KEY: Selector = Selector::parse(".chave").unwrap();
    static ref ITEM_ROW: Selector = Selector::parse(r#"tr[id^="Item"]"#).unwrap();
    static ref TD: Selector = Selector::parse("td").unwrap();
    static ref SPAN: Selector = Selector::parse("span").unwrap();
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

/// Direct children of an element as text blocks, blanks skipped.
fn child_blocks(container: ElementRef<'_>) -> Vec<String> {
    container
        .children()
        .filter_map(|node| {
            if let Some(element) = ElementRef::wrap(node) {
                Some(text_of(element))
            } else {
                node.value().as_text().map(|text| text.to_string())
            }
        })
        .filter(|text| !text.trim().is_empty())
        .collect()
}

fn parse_issuer(doc: &Html) -> Result<NfeIssuer> {
    let container = doc
        .select(&ISSUER_CONTAINER)
        .next()
        .ok_or_else(|| missing("issuer container"))?;

    // Line 1: store name, line 2: "CNPJ: ...", line 3: address blob.
    let blocks = child_blocks(container);
    if blocks.len() < 3 {
        return Err(missing("issuer container lines"));
    }

    let national = value::normalize(&blocks[1].replace("CNPJ:", ""));
    if !NATIONAL_REGISTRATION.is_match(&national) {
        return Err(ValidationError::NationalRegistration(national).into());
    }

    Ok(NfeIssuer {
        name: value::normalize(&blocks[0]),
        national_registration_code: national,
        state_registration_code: None,
        address: parse_address(&blocks[2])?,
    })
}

fn parse_address(raw: &str) -> Result<Address> {
    let text = raw.replace(['\n', '\t'], " ");
    let text = ADDRESS_BLANK_SEGMENT.replace_all(&text, ",");

    // Two known shapes: the 6-part one carries an extra placeholder
    // segment between number and neighborhood.
    let parts: Vec<&str> = text.split(',').collect();
    let (street, number, neighborhood, city, state) = match parts.as_slice() {
        [street, number, neighborhood, city, state] => {
            (street, number, neighborhood, city, state)
        }
        [street, number, _, neighborhood, city, state] => {
            (street, number, neighborhood, city, state)
        }
        _ => {
            return Err(ValidationError::AddressShape {
                text: value::normalize(&text),
                parts: parts.len(),
            }
            .into());
        }
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
    let heading = doc
        .select(&HEADING)
        .find(|heading| value::normalize(&text_of(*heading)) == "Consumidor")
        .ok_or_else(|| missing("consumer heading"))?;
    let section = heading
        .parent()
        .and_then(ElementRef::wrap)
        .ok_or_else(|| missing("consumer section"))?;
    let identification = section
        .select(&BOLD)
        .next()
        .ok_or_else(|| missing("consumer identification"))?;

    Ok(NfeConsumer {
        identification: value::normalize(&text_of(identification).replace("CPF:", "")),
    })
}

fn parse_issued_date(doc: &Html) -> Result<DateTime<Utc>> {
    let label = doc
        .select(&BOLD)
        .find(|bold| text_of(*bold).contains("Emissão:"))
        .ok_or_else(|| missing("issue date label"))?;
    let container = label
        .parent()
        .and_then(ElementRef::wrap)
        .ok_or_else(|| missing("issue date container"))?;

    let text = text_of(container);
    let matched = DATE_TIME
        .find(&text)
        .ok_or_else(|| missing("issue date value"))?;

    Ok(value::to_datetime(matched.as_str())?)
}

/// Text of the first `#linhaTotal` row containing the given label.
fn total_row_text(doc: &Html, label: &str) -> Option<String> {
    doc.select(&TOTAL_ROW)
        .map(text_of)
        .find(|text| text.contains(label))
}

fn parse_total_amount(doc: &Html) -> Result<Decimal> {
    let row = total_row_text(doc, "Valor a pagar").ok_or_else(|| missing("total amount row"))?;
    let fragment = row
        .split(':')
        .nth(1)
        .ok_or_else(|| missing("total amount value"))?;
    Ok(value::to_decimal(fragment)?)
}

fn parse_total_discounts(doc: &Html) -> Result<Decimal> {
    // This template frequently omits the discounts row entirely.
    let Some(row) = total_row_text(doc, "Descontos R$") else {
        return Ok(Decimal::ZERO);
    };
    let fragment = row
        .split(':')
        .nth(1)
        .ok_or_else(|| missing("discounts value"))?;
    Ok(value::to_decimal(fragment)?)
}

fn parse_payment_type(doc: &Html) -> Result<PaymentType> {
    let header = doc
        .select(&PAYMENT_ROW)
        .next()
        .ok_or_else(|| missing("payment header row"))?;

    // The description lives in the next non-blank sibling of the
    // "Forma de pagamento" header row.
    let mut sibling = header.next_sibling();
    while let Some(node) = sibling {
        if let Some(element) = ElementRef::wrap(node) {
            return Ok(value::to_payment_type(&text_of(element))?);
        }
        if let Some(text) = node.value().as_text() {
            if !text.trim().is_empty() {
                return Ok(value::to_payment_type(text)?);
            }
        }
        sibling = node.next_sibling();
    }

    Err(missing("payment description row"))
}

fn parse_access_key(doc: &Html) -> Result<String> {
    let element = doc
        .select(&ACCESS_KEY)
        .next()
        .ok_or_else(|| missing("access key"))?;
    Ok(value::normalize_compact(&text_of(element)))
}

fn parse_items(doc: &Html) -> Result<Vec<NfeItem>> {
    let mut items = Vec::new();

    for row in doc.select(&ITEM_ROW) {
        let cells: Vec<_> = row.select(&TD).collect();
        let [detail, total_cell, ..] = cells.as_slice() else {
            return Err(missing("item row cells"));
        };

        // Detail cell: description, "(Código: ...)", quantity, unit and
        // unitary price, one span each, labels bolded inline.
        let spans: Vec<_> = detail.select(&SPAN).collect();
        let [description, barcode, quantity, unit, unitary_price, ..] = spans.as_slice() else {
            return Err(missing("item detail spans"));
        };

        let barcode_text = text_of(*barcode);
        let barcode = DIGITS
            .find(&barcode_text)
            .ok_or_else(|| missing("item barcode"))?
            .as_str()
            .to_string();

        let quantity_text = text_of(*quantity);
        let quantity = AMOUNT
            .find(&quantity_text)
            .ok_or_else(|| missing("item quantity"))?;

        // The unit token is the text left in the span once the bolded
        // label is taken out.
        let unit_token: String = unit
            .children()
            .filter_map(|node| node.value().as_text().map(|text| text.to_string()))
            .collect();

        let unitary_text = text_of(*unitary_price);
        let unitary_price = AMOUNT
            .find(&unitary_text)
            .ok_or_else(|| missing("item unitary price"))?;

        let total_text = text_of(*total_cell);
        let total_price = AMOUNT
            .find(&total_text)
            .ok_or_else(|| missing("item total price"))?;

        items.push(NfeItem {
            barcode,
            description: value::normalize(&text_of(*description)),
            quantity: value::to_decimal(quantity.as_str())?,
            metric_unit: value::to_metric_unit(&unit_token),
            unitary_price: value::to_decimal(unitary_price.as_str())?,
            total_price: value::to_decimal(total_price.as_str())?,
        });
    }

    Ok(items)
}
