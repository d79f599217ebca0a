//! Build request model
//!
//! A [`SubConfig`] describes one build: where the proxies come from, which
//! template to fill and how names, groups and rules are post-processed.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::BuildError;

lazy_static! {
    static ref BRACKET_ITEM: Regex = Regex::new(r"\[(.*?)\]").unwrap();
    static ref RULE_LIST: Regex = Regex::new(r"^\[.+?,.+?\](,\[.+?,.+?\])*$").unwrap();
    static ref RULE_PROVIDER_LIST: Regex =
        Regex::new(r"^\[.+?,.+?,.+?,.+?,.+?\](,\[.+?,.+?,.+?,.+?,.+?\])*$").unwrap();
}

/// Output dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClashType {
    /// Original Clash core: ss, ssr, vmess and trojan only.
    Clash,
    /// Clash.Meta / mihomo: every supported protocol.
    #[default]
    Meta,
}

impl ClashType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "clash" => Some(ClashType::Clash),
            "meta" | "clash.meta" | "mihomo" => Some(ClashType::Meta),
            _ => None,
        }
    }
}

/// Ordering applied to synthesized groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    SizeAsc,
    SizeDesc,
    #[default]
    NameAsc,
    NameDesc,
}

impl SortKey {
    /// Unknown or empty names fall back to name-ascending.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "sizeasc" => SortKey::SizeAsc,
            "sizedesc" => SortKey::SizeDesc,
            "namedesc" => SortKey::NameDesc,
            _ => SortKey::NameAsc,
        }
    }
}

/// One regex rename: every match of `pattern` in a proxy name becomes `replacement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePair {
    pub pattern: String,
    pub replacement: String,
}

/// Extra routing rule injected into the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub rule: String,
    #[serde(default)]
    pub prepend: bool,
}

/// Extra rule provider injected into the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleProviderEntry {
    pub name: String,
    /// Proxy group that traffic matching the provider is routed to.
    pub group: String,
    pub behavior: String,
    pub url: String,
    #[serde(default)]
    pub prepend: bool,
}

/// Parameters of a single build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubConfig {
    pub clash_type: ClashType,
    /// Subscription urls, each optionally suffixed with `#tag`.
    pub subs: Vec<String>,
    /// Inline proxy links.
    pub proxies: Vec<String>,
    /// Bypass the response cache.
    pub refresh: bool,
    /// Template url, file name under the template directory, or inline YAML.
    pub template: Option<String>,
    pub rule_providers: Vec<RuleProviderEntry>,
    pub rules: Vec<RuleEntry>,
    /// Make country groups `url-test` instead of `select`.
    pub autotest: bool,
    pub lazy: bool,
    pub sort: SortKey,
    /// Proxies whose name matches are dropped.
    pub remove: Option<String>,
    pub replace: Vec<RenamePair>,
    /// Emit only the proxy list.
    pub node_list: bool,
    pub ignore_country_group: bool,
    pub user_agent: Option<String>,
    pub udp: bool,
}

impl SubConfig {
    /// Check the request is buildable before anything is fetched.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.subs.is_empty() && self.proxies.is_empty() {
            return Err(BuildError::InvalidRequest(
                "at least one subscription or proxy link is required".to_string(),
            ));
        }
        for locator in &self.subs {
            let (address, _) = split_origin_tag(locator);
            match Url::parse(address) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
                _ => {
                    return Err(BuildError::InvalidRequest(format!(
                        "subscription '{}' is not an http(s) url",
                        locator
                    )))
                }
            }
        }
        for provider in &self.rule_providers {
            if provider.name.trim().is_empty() || provider.group.trim().is_empty() {
                return Err(BuildError::InvalidRequest(format!(
                    "rule provider for '{}' needs both a name and a group",
                    provider.url
                )));
            }
        }
        Ok(())
    }
}

/// Split a subscription locator into its address and origin tag.
///
/// The tag is whatever follows the last `#`; an empty tag counts as none.
pub fn split_origin_tag(locator: &str) -> (&str, Option<&str>) {
    match locator.rfind('#') {
        Some(pos) => {
            let tag = &locator[pos + 1..];
            let tag = if tag.trim().is_empty() { None } else { Some(tag) };
            (&locator[..pos], tag)
        }
        None => (locator, None),
    }
}

fn bracket_items(input: &str) -> Vec<String> {
    BRACKET_ITEM
        .captures_iter(input)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Parse `[pattern,replacement],[pattern,replacement]`.
pub fn parse_replace_list(input: &str) -> Result<Vec<RenamePair>, BuildError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if !RULE_LIST.is_match(input) {
        return Err(BuildError::InvalidRequest(format!(
            "replace must look like [pattern,replacement],...: '{}'",
            input
        )));
    }
    Ok(bracket_items(input)
        .into_iter()
        .filter_map(|item| {
            item.split_once(',').map(|(pattern, replacement)| RenamePair {
                pattern: pattern.to_string(),
                replacement: replacement.to_string(),
            })
        })
        .collect())
}

/// Parse `[rule,prepend],[rule,prepend]`.
///
/// The rule itself contains commas, so only the last field is the flag.
pub fn parse_rule_list(input: &str) -> Result<Vec<RuleEntry>, BuildError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if !RULE_LIST.is_match(input) {
        return Err(BuildError::InvalidRequest(format!(
            "rule must look like [rule,prepend],...: '{}'",
            input
        )));
    }
    Ok(bracket_items(input)
        .into_iter()
        .filter_map(|item| {
            item.rsplit_once(',').map(|(rule, prepend)| RuleEntry {
                rule: rule.trim().to_string(),
                prepend: parse_flag(prepend),
            })
        })
        .collect())
}

/// Parse `[behavior,url,group,prepend,name],...`.
pub fn parse_rule_provider_list(input: &str) -> Result<Vec<RuleProviderEntry>, BuildError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if !RULE_PROVIDER_LIST.is_match(input) {
        return Err(BuildError::InvalidRequest(format!(
            "rule provider must look like [behavior,url,group,prepend,name],...: '{}'",
            input
        )));
    }
    let mut providers = Vec::new();
    for item in bracket_items(input) {
        let parts: Vec<&str> = item.split(',').map(str::trim).collect();
        if parts.len() != 5 {
            return Err(BuildError::InvalidRequest(format!(
                "rule provider needs exactly five fields: '[{}]'",
                item
            )));
        }
        providers.push(RuleProviderEntry {
            behavior: parts[0].to_string(),
            url: parts[1].to_string(),
            group: parts[2].to_string(),
            prepend: parse_flag(parts[3]),
            name: parts[4].to_string(),
        });
    }
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_origin_tag() {
        assert_eq!(
            split_origin_tag("https://a.example/sub#airport"),
            ("https://a.example/sub", Some("airport"))
        );
        assert_eq!(
            split_origin_tag("https://a.example/sub#x#y"),
            ("https://a.example/sub#x", Some("y"))
        );
        assert_eq!(
            split_origin_tag("https://a.example/sub#"),
            ("https://a.example/sub", None)
        );
        assert_eq!(
            split_origin_tag("https://a.example/sub"),
            ("https://a.example/sub", None)
        );
    }

    #[test]
    fn test_parse_replace_list() {
        let pairs = parse_replace_list("[foo,bar],[(\\d+),#$1]").unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].pattern, "foo");
        assert_eq!(pairs[0].replacement, "bar");
        assert_eq!(pairs[1].pattern, "(\\d+)");
        assert_eq!(pairs[1].replacement, "#$1");
        assert!(parse_replace_list("foo,bar").is_err());
        assert!(parse_replace_list("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rule_list_keeps_commas_in_rule() {
        let rules = parse_rule_list("[DOMAIN-SUFFIX,google.com,Proxy,true],[MATCH,DIRECT,false]")
            .unwrap();
        assert_eq!(
            rules,
            vec![
                RuleEntry {
                    rule: "DOMAIN-SUFFIX,google.com,Proxy".to_string(),
                    prepend: true
                },
                RuleEntry {
                    rule: "MATCH,DIRECT".to_string(),
                    prepend: false
                },
            ]
        );
    }

    #[test]
    fn test_parse_rule_provider_list() {
        let providers =
            parse_rule_provider_list("[domain,https://r.example/ads.yaml,REJECT,true,ads]")
                .unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].behavior, "domain");
        assert_eq!(providers[0].url, "https://r.example/ads.yaml");
        assert_eq!(providers[0].group, "REJECT");
        assert!(providers[0].prepend);
        assert_eq!(providers[0].name, "ads");
        assert!(parse_rule_provider_list("[domain,url,group]").is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = SubConfig::default();
        assert!(config.validate().is_err());

        config.subs = vec!["ftp://a.example/sub".to_string()];
        assert!(config.validate().is_err());

        config.subs = vec!["https://a.example/sub#tag".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sort_key_from_name() {
        assert_eq!(SortKey::from_name("sizedesc"), SortKey::SizeDesc);
        assert_eq!(SortKey::from_name("SizeAsc"), SortKey::SizeAsc);
        assert_eq!(SortKey::from_name(""), SortKey::NameAsc);
        assert_eq!(SortKey::from_name("bogus"), SortKey::NameAsc);
    }

    #[test]
    fn test_request_from_yaml() {
        let yaml = r#"
clash_type: clash
subs: ["https://a.example/sub#A"]
sort: sizedesc
replace:
  - pattern: "foo"
    replacement: "bar"
rules:
  - rule: "MATCH,DIRECT"
    prepend: true
"#;
        let config: SubConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.clash_type, ClashType::Clash);
        assert_eq!(config.sort, SortKey::SizeDesc);
        assert_eq!(config.replace[0].replacement, "bar");
        assert!(config.rules[0].prepend);
        assert!(!config.ignore_country_group);
    }
}
