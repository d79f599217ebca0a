use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use sub2clash::error::{BuildError, FetchError};
use sub2clash::interfaces::{build_sub, probe_userinfo, BuildContext};
use sub2clash::models::{content_key, RenamePair, RuleEntry, RuleProviderEntry, SubConfig};
use sub2clash::utils::cache::{MemoryCacheStore, SubscriptionLoader};
use sub2clash::utils::http::Fetcher;

/// Canned responses keyed by url, counting every GET.
#[derive(Clone, Default)]
struct FakeNet {
    bodies: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    calls: Rc<Cell<u32>>,
    userinfo: Option<String>,
}

impl FakeNet {
    fn serve(&self, url: &str, body: &str) {
        self.bodies
            .borrow_mut()
            .insert(url.to_string(), body.as_bytes().to_vec());
    }

    fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl Fetcher for FakeNet {
    fn get(&self, url: &str, _user_agent: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.set(self.calls.get() + 1);
        self.bodies
            .borrow()
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(404))
    }

    fn head_userinfo(&self, _url: &str, _user_agent: &str) -> Result<Option<String>, FetchError> {
        Ok(self.userinfo.clone())
    }
}

const TEMPLATE: &str = r#"
mode: rule
proxy-groups:
  - name: Proxy
    type: select
    proxies: ["<countries>", "DIRECT"]
  - name: All
    type: select
    proxies: ["<all>"]
  - name: HK
    type: select
    proxies: ["<hk>", "<zz>"]
rules:
  - MATCH,Proxy
"#;

const SUB_A: &str = "https://a.example/sub";
const SUB_B: &str = "https://b.example/sub";

fn link_list() -> String {
    general_purpose::STANDARD.encode(
        "trojan://pw1@hk1.example.com:443#HK%2001\n\
         trojan://pw2@jp1.example.com:443#JP%2001\n",
    )
}

const CLASH_DOC: &str = r#"
proxies:
  - name: SG 01
    type: trojan
    server: sg.example.com
    port: 443
    password: pw3
  - name: HK 01
    type: trojan
    server: hk2.example.com
    port: 443
    password: pw4
"#;

fn context(net: &FakeNet, dir: &Path) -> BuildContext {
    std::fs::write(dir.join("tpl.yaml"), TEMPLATE).unwrap();
    let loader = SubscriptionLoader::new(Box::new(net.clone()), Box::new(MemoryCacheStore::new()))
        .with_retry_delay(Duration::ZERO);
    BuildContext::new(loader).template_dir(dir)
}

fn request(subs: &[&str]) -> SubConfig {
    SubConfig {
        subs: subs.iter().map(|s| s.to_string()).collect(),
        template: Some("tpl.yaml".to_string()),
        ..Default::default()
    }
}

fn group<'a>(sub: &'a sub2clash::Subscription, name: &str) -> &'a sub2clash::models::ProxyGroup {
    sub.proxy_groups
        .iter()
        .find(|g| g.name == name)
        .unwrap_or_else(|| panic!("no group named {}", name))
}

fn proxy_names(sub: &sub2clash::Subscription) -> Vec<&str> {
    sub.proxies.iter().map(|p| p.name.as_str()).collect()
}

#[test]
fn test_merges_two_formats_into_template() {
    let net = FakeNet::default();
    net.serve(SUB_A, &link_list());
    net.serve(SUB_B, CLASH_DOC);
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&net, dir.path());

    let sub = build_sub(&request(&[SUB_A, SUB_B]), &ctx).unwrap();

    // the second "HK 01" is a different server, so it collides instead of deduping
    assert_eq!(proxy_names(&sub), vec!["HK 01", "JP 01", "SG 01", "HK 01 1"]);
    assert_eq!(group(&sub, "All").proxies, vec!["HK 01", "JP 01", "SG 01", "HK 01 1"]);
    assert_eq!(group(&sub, "HK").proxies, vec!["HK 01", "HK 01 1"]);

    let proxy = group(&sub, "Proxy");
    assert_eq!(proxy.proxies.last().map(String::as_str), Some("DIRECT"));
    assert_eq!(proxy.proxies.len(), 4);

    // three template groups plus HK, JP and SG country groups
    assert_eq!(sub.proxy_groups.len(), 6);
    assert_eq!(sub.rules, vec!["MATCH,Proxy"]);
    assert_eq!(sub.mode.as_deref(), Some("rule"));
}

#[test]
fn test_origin_tags_prefix_names() {
    let net = FakeNet::default();
    net.serve(SUB_A, &link_list());
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&net, dir.path());

    let sub = build_sub(&request(&["https://a.example/sub#air"]), &ctx).unwrap();
    assert_eq!(proxy_names(&sub), vec!["air HK 01", "air JP 01"]);
}

#[test]
fn test_duplicates_are_dropped() {
    let net = FakeNet::default();
    net.serve(SUB_A, &link_list());
    net.serve(SUB_B, &link_list());
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&net, dir.path());

    let sub = build_sub(&request(&[SUB_A, SUB_B]), &ctx).unwrap();
    assert_eq!(proxy_names(&sub), vec!["HK 01", "JP 01"]);
}

#[test]
fn test_remove_and_rename() {
    let net = FakeNet::default();
    net.serve(SUB_A, &link_list());
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&net, dir.path());

    let mut config = request(&[SUB_A]);
    config.remove = Some("^JP".to_string());
    config.replace = vec![
        RenamePair {
            pattern: "HK".to_string(),
            replacement: "Hong Kong".to_string(),
        },
        RenamePair {
            pattern: "Kong".to_string(),
            replacement: "Kong Island".to_string(),
        },
    ];
    let sub = build_sub(&config, &ctx).unwrap();
    assert_eq!(proxy_names(&sub), vec!["Hong Kong Island 01"]);
}

#[test]
fn test_ignore_country_group() {
    let net = FakeNet::default();
    net.serve(SUB_A, &link_list());
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&net, dir.path());

    let mut config = request(&[SUB_A]);
    config.ignore_country_group = true;
    let sub = build_sub(&config, &ctx).unwrap();

    assert_eq!(sub.proxy_groups.len(), 3);
    assert_eq!(group(&sub, "Proxy").proxies, vec!["DIRECT"]);
    assert!(group(&sub, "HK").proxies.is_empty());
    assert_eq!(group(&sub, "All").proxies, vec!["HK 01", "JP 01"]);
}

#[test]
fn test_rules_and_providers() {
    let net = FakeNet::default();
    net.serve(SUB_A, &link_list());
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&net, dir.path());

    let mut config = request(&[SUB_A]);
    config.rules = vec![
        RuleEntry {
            rule: "DOMAIN,a.example,DIRECT".to_string(),
            prepend: true,
        },
        RuleEntry {
            rule: "DOMAIN,b.example,DIRECT".to_string(),
            prepend: false,
        },
    ];
    config.rule_providers = vec![RuleProviderEntry {
        name: "ads".to_string(),
        group: "REJECT".to_string(),
        behavior: "domain".to_string(),
        url: "https://r.example/ads.yaml".to_string(),
        prepend: true,
    }];

    let sub = build_sub(&config, &ctx).unwrap();
    assert_eq!(
        sub.rules,
        vec![
            "RULE-SET,ads,REJECT",
            "DOMAIN,a.example,DIRECT",
            "MATCH,Proxy",
            "DOMAIN,b.example,DIRECT",
        ]
    );
    let ads = &sub.rule_providers["ads"];
    assert_eq!(
        ads["path"].as_str(),
        Some(format!("./{}.yaml", content_key("https://r.example/ads.yaml")).as_str())
    );
}

#[test]
fn test_node_list_mode() {
    let net = FakeNet::default();
    net.serve(SUB_A, &link_list());
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&net, dir.path());

    let mut config = request(&[SUB_A]);
    config.node_list = true;
    config.udp = true;
    let sub = build_sub(&config, &ctx).unwrap();

    assert_eq!(proxy_names(&sub), vec!["HK 01", "JP 01"]);
    assert!(sub.proxies.iter().all(|p| p.udp == Some(true)));
    assert!(sub.proxy_groups.is_empty());
    assert!(sub.rules.is_empty());
    assert!(sub.mode.is_none());
}

#[test]
fn test_cache_ttl() {
    let net = FakeNet::default();
    net.serve(SUB_A, &link_list());
    let dir = tempfile::tempdir().unwrap();

    let ctx = context(&net, dir.path()).cache_expire(3600);
    build_sub(&request(&[SUB_A]), &ctx).unwrap();
    build_sub(&request(&[SUB_A]), &ctx).unwrap();
    assert_eq!(net.calls(), 1);

    let mut refresh = request(&[SUB_A]);
    refresh.refresh = true;
    build_sub(&refresh, &ctx).unwrap();
    assert_eq!(net.calls(), 2);

    let ctx = context(&net, dir.path()).cache_expire(0);
    build_sub(&request(&[SUB_A]), &ctx).unwrap();
    build_sub(&request(&[SUB_A]), &ctx).unwrap();
    assert_eq!(net.calls(), 4);
}

#[test]
fn test_fetch_failure_names_url() {
    let net = FakeNet::default();
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&net, dir.path());

    let err = build_sub(&request(&[SUB_A]), &ctx).unwrap_err();
    match err {
        BuildError::Fetch { url, source } => {
            assert_eq!(url, SUB_A);
            assert!(matches!(source, FetchError::Status(404)));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_bad_link_fails_the_build() {
    let net = FakeNet::default();
    net.serve(SUB_A, "trojan://pw@hk.example.com:443#ok\nfoo://nope\n");
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&net, dir.path());

    let err = build_sub(&request(&[SUB_A]), &ctx).unwrap_err();
    assert!(matches!(err, BuildError::Decode { ref url, .. } if url == SUB_A));
}

#[test]
fn test_inline_proxies_only() {
    let net = FakeNet::default();
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&net, dir.path());

    let config = SubConfig {
        proxies: vec!["trojan://pw@sg.example.com:443#SG%2001".to_string()],
        template: Some("tpl.yaml".to_string()),
        ..Default::default()
    };
    let sub = build_sub(&config, &ctx).unwrap();
    assert_eq!(proxy_names(&sub), vec!["SG 01"]);
    assert_eq!(net.calls(), 0);
}

#[test]
fn test_empty_request_is_invalid() {
    let net = FakeNet::default();
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&net, dir.path());
    let err = build_sub(&request(&[]), &ctx).unwrap_err();
    assert!(matches!(err, BuildError::InvalidRequest(_)));
}

#[test]
fn test_userinfo_only_for_single_sub() {
    let net = FakeNet {
        userinfo: Some("upload=1; download=2; total=3; expire=4".to_string()),
        ..Default::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&net, dir.path());

    assert_eq!(
        probe_userinfo(&request(&["https://a.example/sub#tag"]), &ctx).as_deref(),
        Some("upload=1; download=2; total=3; expire=4")
    );
    assert_eq!(probe_userinfo(&request(&[SUB_A, SUB_B]), &ctx), None);
}

#[test]
fn test_output_is_yaml() {
    let net = FakeNet::default();
    net.serve(SUB_A, &link_list());
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&net, dir.path());

    let out = sub2clash::render_sub(&request(&[SUB_A]), &ctx).unwrap();
    let reparsed: sub2clash::Subscription = serde_yaml::from_str(&out).unwrap();
    assert_eq!(proxy_names(&reparsed), vec!["HK 01", "JP 01"]);
    assert!(out.contains("type: trojan"));
}
