//! HTML receipt extraction.
//!
//! The portal has served two structurally different HTML templates
//! over time. Each [`TemplateFamily`] case owns a complete
//! locate-and-extract algorithm for one of them; the two share only
//! the [`value`] conversion layer and the output schema.

mod legacy;
pub mod patterns;
mod portal;
pub mod value;

use std::fmt;

use rust_decimal::Decimal;
use scraper::ElementRef;
use tracing::debug;

use crate::error::{NfeError, Result};
use crate::models::{Nfe, NfeItem};

/// Hostname serving the legacy class-tagged template.
pub const SEFAZ_RS_HOST: &str = "www.sefaz.rs.gov.br";

/// Hostname serving the newer semantic-container template.
pub const SEFAZ_RS_PORTAL_HOST: &str = "dfe-portal.svrs.rs.gov.br";

/// Declared content type of a fetched payload.
///
/// Only HTML payloads have a parser; JSON exists in the portal API
/// surface but selecting it always fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Json,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Html => write!(f, "HTML"),
            ContentType::Json => write!(f, "JSON"),
        }
    }
}

/// The closed set of known template families, each mapped 1:1 to a
/// source host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFamily {
    /// Flat class-tagged `<td>` cells with label-prefixed text.
    Legacy,
    /// Semantic containers with nested `<span>`/`<strong>` runs and
    /// `id`-tagged summary rows.
    Portal,
}

impl TemplateFamily {
    /// Pure lookup from source host and declared content type. There
    /// is no sniffing of the payload itself.
    pub fn for_source(host: &str, content_type: ContentType) -> Result<Self> {
        let unsupported = || NfeError::UnsupportedSource {
            host: host.to_string(),
            content_type,
        };

        if content_type != ContentType::Html {
            return Err(unsupported());
        }

        match host {
            SEFAZ_RS_HOST => Ok(TemplateFamily::Legacy),
            SEFAZ_RS_PORTAL_HOST => Ok(TemplateFamily::Portal),
            _ => Err(unsupported()),
        }
    }

    /// Extract one full record from raw template markup.
    pub fn parse(self, raw_html: &str) -> Result<Nfe> {
        debug!(template = ?self, bytes = raw_html.len(), "parsing receipt markup");
        match self {
            TemplateFamily::Legacy => legacy::parse(raw_html),
            TemplateFamily::Portal => portal::parse(raw_html),
        }
    }
}

/// Parse a fetched payload into a structured receipt record.
///
/// This is the library entry point: it selects the template parser for
/// the `(host, content_type)` pair and runs it over `raw_html`.
pub fn parse_nfe(host: &str, content_type: ContentType, raw_html: &str) -> Result<Nfe> {
    TemplateFamily::for_source(host, content_type)?.parse(raw_html)
}

/// Cross-cutting data-quality gate: the declared document total must
/// exactly equal the sum of the item totals, with no tolerance.
pub(crate) fn reconcile(total_amount: Decimal, items: &[NfeItem]) -> Result<()> {
    let computed: Decimal = items.iter().map(|item| item.total_price).sum();
    if computed != total_amount {
        return Err(NfeError::Reconciliation {
            declared: total_amount,
            computed,
        });
    }
    Ok(())
}

/// All text under an element, concatenated in document order.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}
