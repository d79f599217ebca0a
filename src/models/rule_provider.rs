use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224};

/// Refresh interval given to injected rule providers, in seconds.
pub const DEFAULT_PROVIDER_INTERVAL: u32 = 3600;

/// A `rule-providers:` entry as written into the output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleProvider {
    #[serde(rename = "type")]
    pub provider_type: String,
    pub behavior: String,
    pub url: String,
    pub path: String,
    pub interval: u32,
}

impl RuleProvider {
    /// Build an http provider whose local path is derived from its url.
    pub fn http(behavior: &str, url: &str) -> Self {
        RuleProvider {
            provider_type: "http".to_string(),
            behavior: behavior.to_string(),
            url: url.to_string(),
            path: format!("./{}.yaml", content_key(url)),
            interval: DEFAULT_PROVIDER_INTERVAL,
        }
    }
}

/// Hex encoded SHA-224 of `input`.
///
/// Used both for rule-provider paths and for response cache file names.
pub fn content_key(input: &str) -> String {
    format!("{:x}", Sha224::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_key_is_sha224_hex() {
        // SHA-224 of the empty string
        assert_eq!(
            content_key(""),
            "d14a028c2a3a2bc9476102bb288234c415a2b01f828ea62ac5b3e42f"
        );
        assert_eq!(content_key("https://a.example/rules.yaml").len(), 56);
    }

    #[test]
    fn test_http_provider_defaults() {
        let provider = RuleProvider::http("domain", "https://a.example/rules.yaml");
        assert_eq!(provider.provider_type, "http");
        assert_eq!(provider.interval, 3600);
        assert!(provider.path.starts_with("./"));
        assert!(provider.path.ends_with(".yaml"));
        assert_eq!(provider.path.len(), 2 + 56 + 5);
    }
}
