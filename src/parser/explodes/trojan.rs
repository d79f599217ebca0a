use crate::models::{Proxy, ProxyPayload, Trojan};
use crate::parser::error::{ParseError, ParseErrorKind};

use super::common::{host_and_port, parse_link_url, query_params, remark_or_default, StreamSettings};

pub const TROJAN_PREFIXES: &[&str] = &["trojan://"];

/// Parse a Trojan link into a Proxy object
///
/// Format: `trojan://password@host:port?security=tls&sni=..&type=ws&path=..&host=..#name`
///
/// An empty password is accepted; some servers run without one.
pub fn explode_trojan(trojan: &str) -> Result<Proxy, ParseError> {
    if !TROJAN_PREFIXES.iter().any(|p| trojan.starts_with(p)) {
        return Err(ParseError::new(
            ParseErrorKind::InvalidPrefix,
            "not a trojan link",
            trojan,
        ));
    }

    let url = parse_link_url(trojan)?;
    let (server, port) = host_and_port(&url, trojan)?;
    let password = crate::utils::url::url_decode(url.username());
    let remark = remark_or_default(url.fragment(), &server, port);

    let params = query_params(&url);
    let stream = StreamSettings::from_params(&params);

    let result = Trojan {
        server,
        port,
        password,
        tls: stream.tls,
        sni: stream.sni,
        alpn: stream.alpn,
        client_fingerprint: stream.fingerprint,
        reality_opts: stream.reality,
        network: stream.network,
        ws_opts: stream.ws,
        grpc_opts: stream.grpc,
        skip_cert_verify: stream.skip_cert_verify,
        ..Default::default()
    };

    Ok(Proxy::new(remark, ProxyPayload::Trojan(result)))
}
