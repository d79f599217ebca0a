use crate::models::{Proxy, ProxyPayload, Vless};
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::utils::url::url_decode;

use super::common::{
    host_and_port, param, parse_link_url, query_params, remark_or_default, StreamSettings,
};

pub const VLESS_PREFIXES: &[&str] = &["vless://"];

/// Parse a VLESS link into a Proxy object
///
/// Format: `vless://uuid@host:port?security=reality&pbk=..&sid=..&flow=..&type=grpc#name`
///
/// The uuid is mandatory.
pub fn explode_vless(vless: &str) -> Result<Proxy, ParseError> {
    if !VLESS_PREFIXES.iter().any(|p| vless.starts_with(p)) {
        return Err(ParseError::new(
            ParseErrorKind::InvalidPrefix,
            "not a vless link",
            vless,
        ));
    }

    let url = parse_link_url(vless)?;
    let (server, port) = host_and_port(&url, vless)?;
    let uuid = url_decode(url.username());
    if uuid.trim().is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::MissingField,
            "missing uuid",
            vless,
        ));
    }
    let remark = remark_or_default(url.fragment(), &server, port);

    let params = query_params(&url);
    let stream = StreamSettings::from_params(&params);

    let result = Vless {
        server,
        port,
        uuid,
        flow: param(&params, "flow"),
        tls: stream.tls,
        servername: stream.sni,
        alpn: stream.alpn,
        client_fingerprint: stream.fingerprint,
        reality_opts: stream.reality,
        network: stream.network,
        ws_opts: stream.ws,
        grpc_opts: stream.grpc,
        skip_cert_verify: stream.skip_cert_verify,
        ..Default::default()
    };

    Ok(Proxy::new(remark, ProxyPayload::Vless(result)))
}
