//! Receipt URL handling.
//!
//! The portal QR code points at a consultation URL carrying the fiscal
//! access key in the `p` query parameter. The key is opaque text here;
//! its checksum is not validated.

use url::Url;

use crate::error::{NfeError, Result};

/// Query parameter holding the access key.
pub const ACCESS_KEY_PARAM: &str = "p";

/// A validated receipt consultation URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfeUrl {
    /// The URL as given.
    pub full: String,
    /// Host, used to select the template parser.
    pub host: String,
    /// Access key query parameter, verbatim.
    pub access_key: String,
}

impl NfeUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| NfeError::InvalidUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw).map_err(|err| NfeError::InvalidUrl {
            url: raw.to_string(),
            reason: err.to_string(),
        })?;

        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host"))?
            .to_string();

        let access_key = url
            .query_pairs()
            .find(|(name, _)| name == ACCESS_KEY_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                invalid("missing access key, expected query parameter '?p=<access key>'")
            })?;

        Ok(Self {
            full: raw.to_string(),
            host,
            access_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_host_and_access_key() {
        let key = "43230312345678000199550010001234561234567890|2|1|1|ABCD";
        let raw = format!(
            "https://www.sefaz.rs.gov.br/NFCE/NFCE-COM.aspx?p={}",
            key.replace('|', "%7C")
        );
        let url = NfeUrl::parse(&raw).unwrap();
        assert_eq!(url.host, "www.sefaz.rs.gov.br");
        assert_eq!(url.access_key, key);
    }

    #[test]
    fn rejects_url_without_access_key() {
        let err = NfeUrl::parse("https://www.sefaz.rs.gov.br/NFCE/NFCE-COM.aspx").unwrap_err();
        assert!(matches!(err, NfeError::InvalidUrl { .. }));
    }

    #[test]
    fn rejects_unparseable_url() {
        assert!(matches!(
            NfeUrl::parse("not a url"),
            Err(NfeError::InvalidUrl { .. })
        ));
    }
}
