use crate::models::{Hysteria, Proxy, ProxyPayload};
use crate::parser::error::{ParseError, ParseErrorKind};

use super::common::{
    host_and_port, is_truthy, param, parse_link_url, query_params, remark_or_default, split_alpn,
};

pub const HYSTERIA_PREFIXES: &[&str] = &["hysteria://"];

/// Parse a Hysteria (v1) link into a Proxy object
///
/// Format: `hysteria://host:port?protocol=udp&auth=..&peer=..&insecure=1&upmbps=..&downmbps=..&alpn=..&obfsParam=..#name`
pub fn explode_hysteria(hysteria: &str) -> Result<Proxy, ParseError> {
    if !HYSTERIA_PREFIXES.iter().any(|p| hysteria.starts_with(p)) {
        return Err(ParseError::new(
            ParseErrorKind::InvalidPrefix,
            "not a hysteria link",
            hysteria,
        ));
    }

    let url = parse_link_url(hysteria)?;
    let (server, port) = host_and_port(&url, hysteria)?;
    let remark = remark_or_default(url.fragment(), &server, port);
    let params = query_params(&url);

    let result = Hysteria {
        server,
        port,
        auth_str: param(&params, "auth"),
        up: param(&params, "upmbps"),
        down: param(&params, "downmbps"),
        obfs: param(&params, "obfsParam"),
        protocol: param(&params, "protocol"),
        sni: param(&params, "peer"),
        alpn: split_alpn(params.get("alpn").map(String::as_str)),
        skip_cert_verify: is_truthy(params.get("insecure")).then_some(true),
        ..Default::default()
    };

    Ok(Proxy::new(remark, ProxyPayload::Hysteria(result)))
}
