use crate::models::{Hysteria2, Proxy, ProxyPayload};
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::utils::url::url_decode;

use super::common::{
    host_and_port, is_truthy, param, parse_link_url, query_params, remark_or_default, split_alpn,
};

pub const HYSTERIA2_PREFIXES: &[&str] = &["hysteria2://", "hy2://"];

/// Parse a Hysteria2 link into a Proxy object
///
/// Format: `hysteria2://password@host:port?sni=..&insecure=1&obfs=salamander&obfs-password=..#name`
///
/// `hy2://` is accepted as an alias. A `user:pass` user info is kept whole
/// as the password.
pub fn explode_hysteria2(hysteria2: &str) -> Result<Proxy, ParseError> {
    if !HYSTERIA2_PREFIXES.iter().any(|p| hysteria2.starts_with(p)) {
        return Err(ParseError::new(
            ParseErrorKind::InvalidPrefix,
            "not a hysteria2 link",
            hysteria2,
        ));
    }

    let url = parse_link_url(hysteria2)?;
    let (server, port) = host_and_port(&url, hysteria2)?;
    let mut password = url_decode(url.username());
    if let Some(secret) = url.password() {
        password = format!("{}:{}", password, url_decode(secret));
    }
    let remark = remark_or_default(url.fragment(), &server, port);
    let params = query_params(&url);

    let result = Hysteria2 {
        server,
        port,
        password,
        up: param(&params, "up"),
        down: param(&params, "down"),
        obfs: param(&params, "obfs"),
        obfs_password: param(&params, "obfs-password"),
        sni: param(&params, "sni"),
        alpn: split_alpn(params.get("alpn").map(String::as_str)),
        skip_cert_verify: is_truthy(params.get("insecure")).then_some(true),
        ..Default::default()
    };

    Ok(Proxy::new(remark, ProxyPayload::Hysteria2(result)))
}
