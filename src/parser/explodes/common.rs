//! Pieces of link grammar shared by every decoder.

use std::collections::HashMap;

use url::Url;

use crate::models::{GrpcOptions, RealityOptions, WsOptions};
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::utils::url::url_decode;

/// Parse a port string, requiring an integer in 1..=65535.
pub fn parse_port(port: &str, raw: &str) -> Result<u16, ParseError> {
    match port.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(ParseError::new(
            ParseErrorKind::InvalidPort,
            format!("'{}' is not a valid port", port),
            raw,
        )),
        Ok(p) => Ok(p),
    }
}

/// Split `host:port` or `[v6]:port`.
pub fn split_host_port(address: &str, raw: &str) -> Result<(String, u16), ParseError> {
    let (host, port) = match address.rsplit_once(':') {
        Some(parts) => parts,
        None => {
            return Err(ParseError::new(
                ParseErrorKind::InvalidStructure,
                "missing server port",
                raw,
            ))
        }
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::InvalidStructure,
            "missing server host",
            raw,
        ));
    }
    if port.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::InvalidStructure,
            "missing server port",
            raw,
        ));
    }
    Ok((host.to_string(), parse_port(port, raw)?))
}

/// Parse a link as a URL, keeping port failures distinguishable.
pub fn parse_link_url(link: &str) -> Result<Url, ParseError> {
    Url::parse(link).map_err(|err| match err {
        url::ParseError::InvalidPort => {
            ParseError::new(ParseErrorKind::InvalidPort, "port out of range", link)
        }
        other => ParseError::new(
            ParseErrorKind::InvalidStructure,
            format!("url parse error: {}", other),
            link,
        ),
    })
}

/// Host and port of an already parsed link; both are mandatory.
pub fn host_and_port(url: &Url, raw: &str) -> Result<(String, u16), ParseError> {
    let host = url
        .host_str()
        .unwrap_or("")
        .trim_start_matches('[')
        .trim_end_matches(']');
    if host.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::InvalidStructure,
            "missing server host",
            raw,
        ));
    }
    let port = match url.port() {
        Some(port) => port,
        None => {
            return Err(ParseError::new(
                ParseErrorKind::InvalidStructure,
                "missing server port",
                raw,
            ))
        }
    };
    if port == 0 {
        return Err(ParseError::new(
            ParseErrorKind::InvalidPort,
            "port 0 is not usable",
            raw,
        ));
    }
    Ok((host.to_string(), port))
}

/// Display name of a link: the decoded fragment, or `host:port`.
pub fn remark_or_default(fragment: Option<&str>, server: &str, port: u16) -> String {
    let remark = fragment.map(url_decode).unwrap_or_default();
    let remark = remark.trim();
    if remark.is_empty() {
        format!("{}:{}", server, port)
    } else {
        remark.to_string()
    }
}

/// Query string of a link as a map; later duplicates win.
pub fn query_params(url: &Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Value of a query key, or `None` when absent or empty.
pub fn param(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params
        .get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Comma separated ALPN list.
pub fn split_alpn(value: Option<&str>) -> Option<Vec<String>> {
    let alpn: Vec<String> = value?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if alpn.is_empty() {
        None
    } else {
        Some(alpn)
    }
}

/// `1` / `true` flags used by `insecure=` and `allowInsecure=`.
pub fn is_truthy(value: Option<&String>) -> bool {
    value.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Security and transport options read from a V2Ray style query string.
///
/// `security=tls|xtls` turns TLS on with SNI and ALPN, `reality` adds the
/// Reality key pair and fingerprint, `type=ws` carries a path and `Host`
/// header, `type=grpc` a service name.
#[derive(Debug, Default)]
pub struct StreamSettings {
    pub network: Option<String>,
    pub tls: Option<bool>,
    pub sni: Option<String>,
    pub alpn: Option<Vec<String>>,
    pub fingerprint: Option<String>,
    pub reality: Option<RealityOptions>,
    pub ws: Option<WsOptions>,
    pub grpc: Option<GrpcOptions>,
    pub skip_cert_verify: Option<bool>,
}

impl StreamSettings {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let mut settings = StreamSettings {
            network: param(params, "type"),
            ..Default::default()
        };

        match param(params, "security").as_deref() {
            Some("tls") | Some("xtls") => {
                settings.tls = Some(true);
                settings.sni = param(params, "sni");
                settings.alpn = split_alpn(params.get("alpn").map(String::as_str));
                settings.fingerprint = param(params, "fp");
            }
            Some("reality") => {
                settings.tls = Some(true);
                settings.sni = param(params, "sni");
                settings.fingerprint = param(params, "fp");
                settings.reality = Some(RealityOptions {
                    public_key: param(params, "pbk").unwrap_or_default(),
                    short_id: param(params, "sid").unwrap_or_default(),
                    ..Default::default()
                });
            }
            _ => {}
        }

        match settings.network.as_deref() {
            Some("ws") => {
                let path = param(params, "path").unwrap_or_default();
                let host = param(params, "host").unwrap_or_default();
                settings.ws = Some(WsOptions::with_host(&path, &host));
            }
            Some("grpc") => {
                settings.grpc = Some(GrpcOptions {
                    grpc_service_name: param(params, "serviceName").unwrap_or_default(),
                    ..Default::default()
                });
            }
            _ => {}
        }

        if is_truthy(params.get("allowInsecure")) || is_truthy(params.get("insecure")) {
            settings.skip_cert_verify = Some(true);
        }
        settings
    }
}
