//! Receipt page fetching.
//!
//! The legacy consultation page serves a thin wrapper whose only
//! content is an `<iframe>` pointing at the actual receipt markup, so
//! a fetch follows at most one iframe hop before handing the body to
//! the extractor.

use scraper::{Html, Selector};
use tracing::debug;

use nfe_core::{ContentType, NfeUrl};

/// A fetched receipt page, ready for parser selection.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Host of the consultation URL, used to select the template.
    pub host: String,
    pub content_type: ContentType,
    pub body: String,
}

pub async fn fetch(client: &reqwest::Client, url: &NfeUrl) -> anyhow::Result<FetchedPage> {
    let response = client.get(&url.full).send().await?.error_for_status()?;
    let content_type = content_type_of(&response);
    let body = response.text().await?;

    if content_type != ContentType::Html {
        return Ok(FetchedPage {
            host: url.host.clone(),
            content_type,
            body,
        });
    }

    // One-level iframe follow; the Html document must be dropped
    // before the next await point.
    let Some(target) = iframe_target(&body) else {
        return Ok(FetchedPage {
            host: url.host.clone(),
            content_type,
            body,
        });
    };

    let target = reqwest::Url::parse(&url.full)?.join(&target)?;
    debug!("following iframe to {target}");

    let response = client.get(target).send().await?.error_for_status()?;
    let content_type = content_type_of(&response);
    let body = response.text().await?;

    Ok(FetchedPage {
        host: url.host.clone(),
        content_type,
        body,
    })
}

fn content_type_of(response: &reqwest::Response) -> ContentType {
    let header = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if header.contains("json") {
        ContentType::Json
    } else {
        ContentType::Html
    }
}

/// `src` of the first iframe in the document, if any.
fn iframe_target(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let iframe = Selector::parse("iframe").ok()?;

    document
        .select(&iframe)
        .find_map(|element| element.value().attr("src"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_iframe_source() {
        let body = r#"<html><body>
            <iframe src="NFCE-COM.aspx?p=123" width="100%"></iframe>
        </body></html>"#;
        assert_eq!(
            iframe_target(body),
            Some("NFCE-COM.aspx?p=123".to_string())
        );
    }

    #[test]
    fn page_without_iframe_is_terminal() {
        let body = "<html><body><div class=\"txtCenter\">MERCADO</div></body></html>";
        assert_eq!(iframe_target(body), None);
    }
}
