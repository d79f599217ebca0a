use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

/// Type of proxy group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyGroupType {
    Select,
    URLTest,
}

impl ProxyGroupType {
    /// Get string representation of the proxy group type
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyGroupType::Select => "select",
            ProxyGroupType::URLTest => "url-test",
        }
    }
}

/// A `proxy-groups:` entry.
///
/// Only the keys the merge touches are modelled; anything else a template
/// puts on a group is kept in `extra` and written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProxyGroup {
    pub name: String,
    #[serde(rename = "type", default)]
    pub group_type: String,
    /// Member tokens: literal proxy/group names or `<placeholder>`s.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proxies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lazy: Option<bool>,
    #[serde(flatten)]
    pub extra: Mapping,
    /// Set on groups synthesized per country; never read from or written to YAML.
    #[serde(skip)]
    pub is_country_group: bool,
}

impl ProxyGroup {
    /// Create a new proxy group
    pub fn new(name: impl Into<String>, group_type: ProxyGroupType) -> Self {
        Self {
            name: name.into(),
            group_type: group_type.as_str().to_string(),
            ..Default::default()
        }
    }

    /// Number of member tokens, used when sorting by size.
    pub fn size(&self) -> usize {
        self.proxies.len()
    }
}
