use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use super::{Proxy, ProxyGroup};

/// A Clash document.
///
/// The same shape serves for decoded subscriptions, for the template being
/// filled in and for the final output. Top-level keys that are not modelled
/// here are kept in `extra` so a template round-trips without losing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Subscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socks_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mixed_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_lan: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_controller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proxies: Vec<Proxy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proxy_groups: Vec<ProxyGroup>,
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    pub rule_providers: Mapping,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl Subscription {
    /// A document carrying nothing but the given proxies.
    pub fn node_list(proxies: Vec<Proxy>) -> Self {
        Subscription {
            proxies,
            ..Default::default()
        }
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_keeps_unknown_keys() {
        let yaml = r#"
mixed-port: 7890
mode: rule
tun:
  enable: true
proxy-groups:
  - name: Proxy
    type: select
    proxies: ["<all>"]
    disable-udp: true
rules:
  - MATCH,Proxy
"#;
        let sub: Subscription = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(sub.mixed_port, Some(7890));
        assert_eq!(sub.proxy_groups.len(), 1);
        assert!(sub.proxy_groups[0]
            .extra
            .contains_key(&Value::String("disable-udp".to_string())));
        assert!(sub.extra.contains_key(&Value::String("tun".to_string())));

        let out = sub.to_yaml().unwrap();
        assert!(out.contains("tun:"));
        assert!(out.contains("disable-udp: true"));
        assert!(out.contains("- MATCH,Proxy"));
    }

    #[test]
    fn test_plain_text_is_not_a_document() {
        let text = "trojan://pw@example.com:443#a\nss://YWVzLTEyOC1nY206cHc=@1.2.3.4:8388#b\n";
        assert!(serde_yaml::from_str::<Subscription>(text).is_err());
    }
}
