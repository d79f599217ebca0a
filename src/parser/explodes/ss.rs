use std::collections::BTreeMap;

use serde_yaml::Value;

use crate::models::{Proxy, ProxyPayload, Shadowsocks};
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::utils::base64::base64_decode;
use crate::utils::url::url_decode;

use super::common::{remark_or_default, split_host_port};

pub const SS_PREFIXES: &[&str] = &["ss://"];

/// Parse a Shadowsocks link into a Proxy object
///
/// Accepted layouts:
/// * SIP002: `ss://base64(method:password)@host:port/?plugin=..#name`
/// * plain user info: `ss://method:password@host:port#name`
/// * legacy: `ss://base64(method:password@host:port)#name`
///
/// Both method and password are mandatory.
pub fn explode_ss(ss: &str) -> Result<Proxy, ParseError> {
    let content = match SS_PREFIXES.iter().find_map(|p| ss.strip_prefix(p)) {
        Some(content) => content,
        None => {
            return Err(ParseError::new(
                ParseErrorKind::InvalidPrefix,
                "not a shadowsocks link",
                ss,
            ))
        }
    };

    let (content, fragment) = match content.split_once('#') {
        Some((body, fragment)) => (body, Some(fragment)),
        None => (content, None),
    };
    let (content, query) = match content.split_once('?') {
        Some((body, query)) => (body, Some(query)),
        None => (content, None),
    };
    let content = content.trim_end_matches('/');

    let (secret, address) = match content.rsplit_once('@') {
        Some((user_info, address)) => (decode_user_info(user_info, ss)?, address.to_string()),
        None => {
            let decoded = base64_decode(content).map_err(|e| {
                ParseError::new(
                    ParseErrorKind::InvalidEncoding,
                    format!("legacy body is not base64: {}", e),
                    ss,
                )
            })?;
            match decoded.rsplit_once('@') {
                Some((secret, address)) => (secret.to_string(), address.to_string()),
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidStructure,
                        "missing server address",
                        ss,
                    ))
                }
            }
        }
    };

    let (cipher, password) = secret.split_once(':').unwrap_or((secret.as_str(), ""));
    if cipher.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::MissingField,
            "missing cipher",
            ss,
        ));
    }
    if password.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::MissingField,
            "missing password",
            ss,
        ));
    }

    let (server, port) = split_host_port(&address, ss)?;
    let remark = remark_or_default(fragment, &server, port);

    let (plugin, plugin_opts) = query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == "plugin")
                .map(|(_, v)| v.to_string())
        })
        .map(|p| parse_plugin(&p))
        .unwrap_or((None, None));

    let result = Shadowsocks {
        server,
        port,
        cipher: cipher.to_string(),
        password: password.to_string(),
        plugin,
        plugin_opts,
        ..Default::default()
    };

    Ok(Proxy::new(remark, ProxyPayload::Shadowsocks(result)))
}

/// SIP002 user info is base64, but plain `method:password` is also seen.
fn decode_user_info(user_info: &str, raw: &str) -> Result<String, ParseError> {
    if let Ok(decoded) = base64_decode(user_info) {
        if decoded.contains(':') {
            return Ok(decoded);
        }
    }
    let plain = url_decode(user_info);
    if plain.contains(':') {
        Ok(plain)
    } else {
        Err(ParseError::new(
            ParseErrorKind::InvalidEncoding,
            "user info is neither base64 nor method:password",
            raw,
        ))
    }
}

/// Translate a SIP003 plugin string into the Clash `plugin` / `plugin-opts` pair.
fn parse_plugin(
    plugin: &str,
) -> (Option<String>, Option<BTreeMap<String, Value>>) {
    let mut parts = plugin.split(';');
    let name = parts.next().unwrap_or("").trim();
    if name.is_empty() {
        return (None, None);
    }

    let mut args: Vec<(String, Option<String>)> = Vec::new();
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('=') {
            Some((k, v)) => args.push((k.to_string(), Some(v.to_string()))),
            None => args.push((part.to_string(), None)),
        }
    }
    let lookup = |key: &str| {
        args.iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.clone())
    };

    let mut opts = BTreeMap::new();
    let clash_name = match name {
        "obfs-local" | "simple-obfs" => {
            if let Some(mode) = lookup("obfs") {
                opts.insert("mode".to_string(), Value::String(mode));
            }
            if let Some(host) = lookup("obfs-host") {
                opts.insert("host".to_string(), Value::String(host));
            }
            "obfs"
        }
        "v2ray-plugin" => {
            opts.insert(
                "mode".to_string(),
                Value::String(lookup("mode").unwrap_or_else(|| "websocket".to_string())),
            );
            if let Some(host) = lookup("host") {
                opts.insert("host".to_string(), Value::String(host));
            }
            if let Some(path) = lookup("path") {
                opts.insert("path".to_string(), Value::String(path));
            }
            if args.iter().any(|(k, _)| k == "tls") {
                opts.insert("tls".to_string(), Value::Bool(true));
            }
            "v2ray-plugin"
        }
        other => {
            for (k, v) in &args {
                let value = match v {
                    Some(v) => Value::String(v.clone()),
                    None => Value::Bool(true),
                };
                opts.insert(k.clone(), value);
            }
            other
        }
    };

    let opts = if opts.is_empty() { None } else { Some(opts) };
    (Some(clash_name.to_string()), opts)
}
