//! Proxy model definitions
//!
//! A [`Proxy`] is one normalized outbound definition. It serializes to the
//! Clash `proxies:` entry layout (`name`, `type`, then the protocol fields),
//! and the same YAML text is used as its canonical form for deduplication.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use crate::models::sub_config::ClashType;

/// Visitor accepting either a string or a bare number.
///
/// Subscription authors regularly write numeric passwords without quotes, which
/// YAML then reads back as integers.
struct StringOrNumberVisitor;

impl<'de> Visitor<'de> for StringOrNumberVisitor {
    type Value = Option<String>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("string or number")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Some(value.to_string()))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Some(value.to_string()))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Some(value.to_string()))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Some(value.to_string()))
    }

    fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Some(value.to_string()))
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(None)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(None)
    }
}

fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserializer
        .deserialize_any(StringOrNumberVisitor)?
        .unwrap_or_default())
}

fn deserialize_opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(StringOrNumberVisitor)
}

fn default_cipher() -> String {
    "auto".to_string()
}

/// Represents the type of a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyType {
    Shadowsocks,
    ShadowsocksR,
    VMess,
    Vless,
    Trojan,
    Hysteria,
    Hysteria2,
}

impl ProxyType {
    /// The `type:` value used in Clash documents.
    pub fn as_str(self) -> &'static str {
        match self {
            ProxyType::Shadowsocks => "ss",
            ProxyType::ShadowsocksR => "ssr",
            ProxyType::VMess => "vmess",
            ProxyType::Vless => "vless",
            ProxyType::Trojan => "trojan",
            ProxyType::Hysteria => "hysteria",
            ProxyType::Hysteria2 => "hysteria2",
        }
    }

    /// Whether the plain Clash core understands this proxy type.
    ///
    /// Everything else needs the Meta (mihomo) core.
    pub fn supports_clash(self) -> bool {
        matches!(
            self,
            ProxyType::Shadowsocks | ProxyType::ShadowsocksR | ProxyType::VMess | ProxyType::Trojan
        )
    }

    /// Whether proxies of this type can be emitted for `clash_type`.
    pub fn supports(self, clash_type: ClashType) -> bool {
        match clash_type {
            ClashType::Clash => self.supports_clash(),
            ClashType::Meta => true,
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WebSocket transport options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WsOptions {
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl WsOptions {
    /// Build ws options carrying a `Host` header, omitted when `host` is empty.
    pub fn with_host(path: &str, host: &str) -> Self {
        let mut headers = BTreeMap::new();
        if !host.is_empty() {
            headers.insert("Host".to_string(), host.to_string());
        }
        WsOptions {
            path: path.to_string(),
            headers,
            ..Default::default()
        }
    }
}

/// gRPC transport options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrpcOptions {
    #[serde(rename = "grpc-service-name", default)]
    pub grpc_service_name: String,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// Reality TLS options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RealityOptions {
    #[serde(default)]
    pub public_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short_id: String,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Shadowsocks {
    pub server: String,
    pub port: u16,
    pub cipher: String,
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_opts: Option<BTreeMap<String, serde_yaml::Value>>,
    /// Keys this model does not name, kept as written.
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShadowsocksR {
    pub server: String,
    pub port: u16,
    pub cipher: String,
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub password: String,
    pub obfs: String,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs_param: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_param: Option<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VMess {
    pub server: String,
    pub port: u16,
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub uuid: String,
    #[serde(rename = "alterId", default)]
    pub alter_id: u32,
    #[serde(default = "default_cipher")]
    pub cipher: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Vless {
    pub server: String,
    pub port: u16,
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reality_opts: Option<RealityOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Trojan {
    pub server: String,
    pub port: u16,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reality_opts: Option<RealityOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Hysteria {
    pub server: String,
    pub port: u16,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Hysteria2 {
    pub server: String,
    pub port: u16,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// Protocol specific part of a proxy, tagged by the Clash `type:` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProxyPayload {
    #[serde(rename = "ss")]
    Shadowsocks(Shadowsocks),
    #[serde(rename = "ssr")]
    ShadowsocksR(ShadowsocksR),
    #[serde(rename = "vmess")]
    VMess(VMess),
    #[serde(rename = "vless")]
    Vless(Vless),
    #[serde(rename = "trojan")]
    Trojan(Trojan),
    #[serde(rename = "hysteria")]
    Hysteria(Hysteria),
    #[serde(rename = "hysteria2")]
    Hysteria2(Hysteria2),
}

/// Represents a proxy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proxy {
    pub name: String,
    #[serde(flatten)]
    pub payload: ProxyPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp: Option<bool>,
    /// Origin tag of the subscription this proxy came from.
    #[serde(skip)]
    pub sub_name: Option<String>,
}

impl Proxy {
    pub fn new(name: impl Into<String>, payload: ProxyPayload) -> Self {
        Proxy {
            name: name.into(),
            payload,
            udp: None,
            sub_name: None,
        }
    }

    pub fn proxy_type(&self) -> ProxyType {
        match self.payload {
            ProxyPayload::Shadowsocks(_) => ProxyType::Shadowsocks,
            ProxyPayload::ShadowsocksR(_) => ProxyType::ShadowsocksR,
            ProxyPayload::VMess(_) => ProxyType::VMess,
            ProxyPayload::Vless(_) => ProxyType::Vless,
            ProxyPayload::Trojan(_) => ProxyType::Trojan,
            ProxyPayload::Hysteria(_) => ProxyType::Hysteria,
            ProxyPayload::Hysteria2(_) => ProxyType::Hysteria2,
        }
    }

    pub fn port(&self) -> u16 {
        match &self.payload {
            ProxyPayload::Shadowsocks(p) => p.port,
            ProxyPayload::ShadowsocksR(p) => p.port,
            ProxyPayload::VMess(p) => p.port,
            ProxyPayload::Vless(p) => p.port,
            ProxyPayload::Trojan(p) => p.port,
            ProxyPayload::Hysteria(p) => p.port,
            ProxyPayload::Hysteria2(p) => p.port,
        }
    }

    /// Serialized form used to detect duplicates. The origin tag is not part of it.
    pub fn canonical_form(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
