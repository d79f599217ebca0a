use crate::models::{Proxy, ProxyPayload, ShadowsocksR};
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::utils::base64::base64_decode;

use super::common::{parse_port, remark_or_default};

pub const SSR_PREFIXES: &[&str] = &["ssr://"];

/// Parse a ShadowsocksR link into a Proxy object
///
/// Format: `ssr://base64(host:port:protocol:method:obfs:base64(pass)/?obfsparam=..&protoparam=..&remarks=..)`
///
/// Every parameter value is itself URL-safe base64.
pub fn explode_ssr(ssr: &str) -> Result<Proxy, ParseError> {
    let encoded = match SSR_PREFIXES.iter().find_map(|p| ssr.strip_prefix(p)) {
        Some(encoded) => encoded,
        None => {
            return Err(ParseError::new(
                ParseErrorKind::InvalidPrefix,
                "not a shadowsocksr link",
                ssr,
            ))
        }
    };

    let decoded = base64_decode(encoded).map_err(|e| {
        ParseError::new(
            ParseErrorKind::InvalidEncoding,
            format!("body is not base64: {}", e),
            ssr,
        )
    })?;

    let (main, query) = match decoded.split_once("/?") {
        Some((main, query)) => (main, query),
        None => (decoded.trim_end_matches('/'), ""),
    };

    // host may be an IPv6 literal, so split from the right
    let parts: Vec<&str> = main.rsplitn(6, ':').collect();
    if parts.len() != 6 {
        return Err(ParseError::new(
            ParseErrorKind::InvalidStructure,
            "expected host:port:protocol:method:obfs:password",
            ssr,
        ));
    }
    let (password, obfs, cipher, protocol, port, server) =
        (parts[0], parts[1], parts[2], parts[3], parts[4], parts[5]);

    let server = server.trim_start_matches('[').trim_end_matches(']');
    if server.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::InvalidStructure,
            "missing server host",
            ssr,
        ));
    }
    let port = parse_port(port, ssr)?;

    let password = base64_decode(password).map_err(|e| {
        ParseError::new(
            ParseErrorKind::InvalidEncoding,
            format!("password is not base64: {}", e),
            ssr,
        )
    })?;

    let mut obfs_param = None;
    let mut protocol_param = None;
    let mut remarks = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = match base64_decode(&value) {
            Ok(v) if !v.trim().is_empty() => v,
            _ => continue,
        };
        match key.as_ref() {
            "obfsparam" => obfs_param = Some(value),
            "protoparam" => protocol_param = Some(value),
            "remarks" => remarks = Some(value),
            _ => {}
        }
    }

    let remark = remark_or_default(remarks.as_deref(), server, port);

    let result = ShadowsocksR {
        server: server.to_string(),
        port,
        cipher: cipher.to_string(),
        password,
        obfs: obfs.to_string(),
        protocol: protocol.to_string(),
        obfs_param,
        protocol_param,
        ..Default::default()
    };

    Ok(Proxy::new(remark, ProxyPayload::ShadowsocksR(result)))
}
