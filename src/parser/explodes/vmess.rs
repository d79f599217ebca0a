use serde_json::Value;

use crate::models::{GrpcOptions, Proxy, ProxyPayload, VMess, WsOptions};
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::utils::base64::base64_decode;

use super::common::{parse_port, remark_or_default, split_alpn};

pub const VMESS_PREFIXES: &[&str] = &["vmess://"];

/// Read a JSON field that generators emit either as a string or a number.
fn json_string(json: &Value, key: &str) -> Option<String> {
    match json.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse a VMess link into a Proxy object
///
/// Format: `vmess://base64({"v":"2","ps":..,"add":..,"port":..,"id":..,"aid":..,"net":..})`
///
/// `port` and `aid` may be strings or numbers. The user id is mandatory.
pub fn explode_vmess(vmess: &str) -> Result<Proxy, ParseError> {
    let encoded = match VMESS_PREFIXES.iter().find_map(|p| vmess.strip_prefix(p)) {
        Some(encoded) => encoded,
        None => {
            return Err(ParseError::new(
                ParseErrorKind::InvalidPrefix,
                "not a vmess link",
                vmess,
            ))
        }
    };

    let decoded = base64_decode(encoded).map_err(|e| {
        ParseError::new(
            ParseErrorKind::InvalidEncoding,
            format!("body is not base64: {}", e),
            vmess,
        )
    })?;

    let json: Value = serde_json::from_str(&decoded).map_err(|e| {
        ParseError::new(
            ParseErrorKind::InvalidStructure,
            format!("body is not a JSON object: {}", e),
            vmess,
        )
    })?;
    if !json.is_object() {
        return Err(ParseError::new(
            ParseErrorKind::InvalidStructure,
            "body is not a JSON object",
            vmess,
        ));
    }

    let server = match json_string(&json, "add") {
        Some(server) => server,
        None => {
            return Err(ParseError::new(
                ParseErrorKind::InvalidStructure,
                "missing server address",
                vmess,
            ))
        }
    };
    let port = match json_string(&json, "port") {
        Some(port) => parse_port(&port, vmess)?,
        None => {
            return Err(ParseError::new(
                ParseErrorKind::InvalidStructure,
                "missing server port",
                vmess,
            ))
        }
    };
    let uuid = match json_string(&json, "id") {
        Some(id) => id,
        None => {
            return Err(ParseError::new(
                ParseErrorKind::MissingField,
                "missing user id",
                vmess,
            ))
        }
    };
    let alter_id = json_string(&json, "aid")
        .and_then(|aid| aid.parse::<u32>().ok())
        .unwrap_or(0);
    let remark = remark_or_default(json_string(&json, "ps").as_deref(), &server, port);

    let mut result = VMess {
        server,
        port,
        uuid,
        alter_id,
        cipher: json_string(&json, "scy").unwrap_or_else(|| "auto".to_string()),
        ..Default::default()
    };

    if json_string(&json, "tls").as_deref() == Some("tls") {
        result.tls = Some(true);
        result.servername = json_string(&json, "sni");
        result.alpn = split_alpn(json_string(&json, "alpn").as_deref());
        result.client_fingerprint = json_string(&json, "fp");
    }

    let host = json_string(&json, "host").unwrap_or_default();
    let path = json_string(&json, "path").unwrap_or_default();
    match json_string(&json, "net").as_deref() {
        Some("ws") => {
            result.network = Some("ws".to_string());
            result.ws_opts = Some(WsOptions::with_host(&path, &host));
        }
        Some("grpc") => {
            result.network = Some("grpc".to_string());
            result.grpc_opts = Some(GrpcOptions {
                grpc_service_name: path,
                ..Default::default()
            });
        }
        Some(other) if other != "tcp" => result.network = Some(other.to_string()),
        _ => {}
    }

    Ok(Proxy::new(remark, ProxyPayload::VMess(result)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vmess_of(proxy: &Proxy) -> &VMess {
        match &proxy.payload {
            ProxyPayload::VMess(v) => v,
            other => panic!("expected vmess, got {:?}", other),
        }
    }

    #[test]
    fn test_explode_vmess_ws_tls() {
        let link = "vmess://eyJ2IjoiMiIsInBzIjoiVk1lc3MgSEsiLCJhZGQiOiJoay5leGFtcGxlLmNvbSIsInBvcnQiOiI0NDMiLCJpZCI6ImI4MzEzODFkLTYzMjQtNGQ1My1hZDRmLThjZGE0OGIzMDgxMSIsImFpZCI6IjAiLCJzY3kiOiJhdXRvIiwibmV0Ijoid3MiLCJ0eXBlIjoibm9uZSIsImhvc3QiOiJjZG4uZXhhbXBsZS5jb20iLCJwYXRoIjoiL3JheSIsInRscyI6InRscyIsInNuaSI6ImhrLmV4YW1wbGUuY29tIiwiYWxwbiI6ImgyLGh0dHAvMS4xIiwiZnAiOiJjaHJvbWUifQ==";
        let proxy = explode_vmess(link).unwrap();
        assert_eq!(proxy.name, "VMess HK");
        let v = vmess_of(&proxy);
        assert_eq!(v.server, "hk.example.com");
        assert_eq!(v.port, 443);
        assert_eq!(v.uuid, "b831381d-6324-4d53-ad4f-8cda48b30811");
        assert_eq!(v.alter_id, 0);
        assert_eq!(v.cipher, "auto");
        assert_eq!(v.tls, Some(true));
        assert_eq!(v.servername.as_deref(), Some("hk.example.com"));
        assert_eq!(
            v.alpn,
            Some(vec!["h2".to_string(), "http/1.1".to_string()])
        );
        assert_eq!(v.client_fingerprint.as_deref(), Some("chrome"));
        let ws = v.ws_opts.as_ref().unwrap();
        assert_eq!(ws.path, "/ray");
        assert_eq!(ws.headers.get("Host").map(String::as_str), Some("cdn.example.com"));
    }

    #[test]
    fn test_explode_vmess_numeric_port_and_grpc() {
        let link = "vmess://eyJ2IjoiMiIsInBzIjoiIiwiYWRkIjoiMS4yLjMuNCIsInBvcnQiOjgwLCJpZCI6ImI4MzEzODFkLTYzMjQtNGQ1My1hZDRmLThjZGE0OGIzMDgxMSIsImFpZCI6MCwibmV0IjoiZ3JwYyIsInBhdGgiOiJzdmMiLCJ0bHMiOiIifQ==";
        let proxy = explode_vmess(link).unwrap();
        assert_eq!(proxy.name, "1.2.3.4:80");
        let v = vmess_of(&proxy);
        assert_eq!(v.port, 80);
        assert_eq!(v.tls, None);
        assert_eq!(v.network.as_deref(), Some("grpc"));
        assert_eq!(v.grpc_opts.as_ref().unwrap().grpc_service_name, "svc");
    }

    #[test]
    fn test_explode_vmess_errors() {
        assert_eq!(
            explode_vmess("vmess://%%%").unwrap_err().kind,
            ParseErrorKind::InvalidEncoding
        );
        // base64("not json")
        assert_eq!(
            explode_vmess("vmess://bm90IGpzb24=").unwrap_err().kind,
            ParseErrorKind::InvalidStructure
        );
        assert_eq!(
            explode_vmess("vmess://eyJ2IjoiMiIsInBzIjoieCIsImFkZCI6IjEuMi4zLjQiLCJwb3J0IjoiYWJjIiwiaWQiOiJiODMxMzgxZC02MzI0LTRkNTMtYWQ0Zi04Y2RhNDhiMzA4MTEifQ==")
                .unwrap_err()
                .kind,
            ParseErrorKind::InvalidPort
        );
        assert_eq!(
            explode_vmess("vmess://eyJ2IjoiMiIsInBzIjoieCIsImFkZCI6IjEuMi4zLjQiLCJwb3J0IjoiNDQzIiwiaWQiOiIifQ==")
                .unwrap_err()
                .kind,
            ParseErrorKind::MissingField
        );
    }
}
