//! Subscription body sniffing
//!
//! A subscription endpoint may answer with a Clash YAML document, a plain
//! newline separated list of links, or that same list wrapped in base64.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde_yaml::Value;

use crate::models::Subscription;
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::parser::registry::DecoderTable;
use crate::utils::base64::base64_decode;

lazy_static! {
    static ref LINK_SCHEME: Regex =
        Regex::new(r"(ssr|ss|vmess|trojan|vless|hysteria|hy2|hysteria2)://").unwrap();
}

/// Shape of a subscription body as detected by [`detect_format`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubFormat {
    /// Clash document, already parsed as YAML.
    Structured(Value),
    /// Plain text, one link per line.
    LinkList,
    /// Link list wrapped in base64.
    Base64,
}

/// Decide how a body should be decoded without decoding the links.
///
/// Any YAML mapping is a Clash document, possibly without proxies. The one
/// exception is a link list whose remarks happen to read as `key: value`.
pub fn detect_format(text: &str) -> SubFormat {
    let has_links = LINK_SCHEME.is_match(text);
    match serde_yaml::from_str::<Value>(text) {
        Ok(value @ Value::Mapping(_)) if !has_links || value.get("proxies").is_some() => {
            SubFormat::Structured(value)
        }
        _ if has_links => SubFormat::LinkList,
        _ => SubFormat::Base64,
    }
}

/// Decode one subscription body into a document.
///
/// Link lists are returned as a document holding only proxies. Any line that
/// fails to decode fails the whole body.
pub fn parse_subscription(data: &[u8], table: &DecoderTable) -> Result<Subscription, ParseError> {
    let text = String::from_utf8_lossy(data);
    let text = text.trim_start_matches('\u{feff}');

    match detect_format(text) {
        SubFormat::Structured(value) => {
            debug!("Subscription body is a Clash document");
            serde_yaml::from_value::<Subscription>(value).map_err(|e| {
                ParseError::new(
                    ParseErrorKind::InvalidStructure,
                    format!("malformed Clash document: {}", e),
                    text,
                )
            })
        }
        SubFormat::LinkList => {
            debug!("Subscription body is a plain link list");
            Ok(Subscription::node_list(table.parse_lines(text)?))
        }
        SubFormat::Base64 => {
            debug!("Subscription body treated as base64");
            let decoded = base64_decode(text).map_err(|e| {
                ParseError::new(
                    ParseErrorKind::InvalidEncoding,
                    format!("body is neither YAML, links nor base64: {}", e),
                    text,
                )
            })?;
            Ok(Subscription::node_list(table.parse_lines(&decoded)?))
        }
    }
}
