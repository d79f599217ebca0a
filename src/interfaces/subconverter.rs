use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};

use crate::error::BuildError;
use crate::generator::group::{add_proxies, synthesize, GroupOptions};
use crate::generator::merge::merge_sub_and_template;
use crate::generator::node_manip::preprocess_nodes;
use crate::generator::rules::{add_rule_providers, add_rules};
use crate::models::sub_config::split_origin_tag;
use crate::models::{ClashType, Proxy, SubConfig, Subscription};
use crate::parser::{parse_subscription, DecoderTable};
use crate::settings::Settings;
use crate::utils::cache::{FileCacheStore, SubscriptionLoader};
use crate::utils::file::read_file_in;
use crate::utils::http::HttpFetcher;
use crate::utils::matcher::NameRules;
use crate::utils::url::{is_link, url_decode};

const BUILTIN_CLASH_TEMPLATE: &str = include_str!("../../templates/template_clash.yaml");
const BUILTIN_META_TEMPLATE: &str = include_str!("../../templates/template_meta.yaml");

/// Everything a build needs besides the request itself.
///
/// Constructed once and shared by every build; nothing here is global.
pub struct BuildContext {
    decoders: DecoderTable,
    loader: SubscriptionLoader,
    template_dir: PathBuf,
    clash_template: String,
    meta_template: String,
    cache_expire: u64,
    retry_times: u32,
    user_agent: String,
}

impl BuildContext {
    /// Context around `loader` with default settings.
    pub fn new(loader: SubscriptionLoader) -> Self {
        let settings = Settings::default();
        BuildContext {
            decoders: DecoderTable::builtin(),
            loader,
            template_dir: PathBuf::from(&settings.template_dir),
            clash_template: settings.clash_template,
            meta_template: settings.meta_template,
            cache_expire: settings.cache_expire,
            retry_times: settings.request_retry_times,
            user_agent: settings.user_agent,
        }
    }

    /// Networked context with a file-backed cache, configured from `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        let fetcher = HttpFetcher::new(
            Duration::from_secs(settings.request_timeout),
            settings.request_max_file_size,
        );
        let store = FileCacheStore::new(&settings.cache_dir);
        let loader = SubscriptionLoader::new(Box::new(fetcher), Box::new(store));
        BuildContext::new(loader)
            .template_dir(&settings.template_dir)
            .templates(&settings.clash_template, &settings.meta_template)
            .cache_expire(settings.cache_expire)
            .retry_times(settings.request_retry_times)
            .user_agent(&settings.user_agent)
    }

    pub fn decoders(mut self, decoders: DecoderTable) -> Self {
        self.decoders = decoders;
        self
    }

    pub fn template_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.template_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Default template references per dialect; empty means built-in.
    pub fn templates(mut self, clash: &str, meta: &str) -> Self {
        self.clash_template = clash.to_string();
        self.meta_template = meta.to_string();
        self
    }

    /// Seconds a cached response stays fresh.
    pub fn cache_expire(mut self, seconds: u64) -> Self {
        self.cache_expire = seconds;
        self
    }

    pub fn retry_times(mut self, times: u32) -> Self {
        self.retry_times = times;
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn loader(&self) -> &SubscriptionLoader {
        &self.loader
    }

    fn load(&self, url: &str, user_agent: &str, refresh: bool) -> Result<Vec<u8>, BuildError> {
        self.loader
            .load(url, user_agent, self.cache_expire, self.retry_times, refresh)
            .map_err(|source| {
                debug!("Failed to load {}: {}", url, source);
                BuildError::Fetch {
                    url: url.to_string(),
                    source,
                }
            })
    }
}

fn effective_user_agent<'a>(config: &'a SubConfig, ctx: &'a BuildContext) -> &'a str {
    match config.user_agent.as_deref().map(str::trim) {
        Some(ua) if !ua.is_empty() => ua,
        _ => &ctx.user_agent,
    }
}

/// Fetch and decode every subscription, then the inline links.
fn collect_proxies(config: &SubConfig, ctx: &BuildContext) -> Result<Vec<Proxy>, BuildError> {
    let user_agent = effective_user_agent(config, ctx);
    let mut proxies = Vec::new();

    for locator in &config.subs {
        let (url, tag) = split_origin_tag(locator);
        let body = ctx.load(url, user_agent, config.refresh)?;
        let sub = parse_subscription(&body, &ctx.decoders).map_err(|source| {
            debug!("Failed to parse subscription {}: {}", url, source);
            BuildError::Decode {
                url: url.to_string(),
                source,
            }
        })?;
        debug!("Loaded {} proxies from {}", sub.proxies.len(), url);
        proxies.extend(sub.proxies.into_iter().map(|mut proxy| {
            proxy.sub_name = tag.map(str::to_string);
            proxy
        }));
    }

    for link in &config.proxies {
        let proxy = ctx.decoders.parse(link).map_err(|source| BuildError::Decode {
            url: link.clone(),
            source,
        })?;
        proxies.push(proxy);
    }

    Ok(proxies)
}

fn builtin_template(clash_type: ClashType) -> &'static str {
    match clash_type {
        ClashType::Clash => BUILTIN_CLASH_TEMPLATE,
        ClashType::Meta => BUILTIN_META_TEMPLATE,
    }
}

fn template_from_bytes(body: Vec<u8>, reference: &str) -> Result<String, BuildError> {
    String::from_utf8(body)
        .map_err(|_| BuildError::Template(format!("template '{}' is not valid UTF-8", reference)))
}

/// Text of a template given by url or by file name inside the template dir.
fn load_template_file(
    reference: &str,
    ctx: &BuildContext,
    user_agent: &str,
    refresh: bool,
) -> Result<Option<String>, BuildError> {
    if is_link(reference) {
        let body = ctx.load(reference, user_agent, refresh)?;
        return template_from_bytes(body, reference).map(Some);
    }
    read_file_in(&ctx.template_dir, reference)
        .map_err(|e| BuildError::Template(format!("failed to read '{}': {}", reference, e)))
}

/// Resolve the template text for a request.
///
/// An explicit reference that is neither a url nor a template file is taken
/// as percent-encoded inline YAML. Without one, the configured default for
/// the dialect is used, falling back to the built-in template.
pub fn resolve_template(config: &SubConfig, ctx: &BuildContext) -> Result<String, BuildError> {
    let user_agent = effective_user_agent(config, ctx);
    if let Some(reference) = config.template.as_deref().filter(|t| !t.trim().is_empty()) {
        let reference = reference.trim();
        return match load_template_file(reference, ctx, user_agent, config.refresh)? {
            Some(text) => Ok(text),
            None => {
                debug!("Treating template reference as inline YAML");
                Ok(url_decode(reference))
            }
        };
    }

    let configured = match config.clash_type {
        ClashType::Clash => ctx.clash_template.trim(),
        ClashType::Meta => ctx.meta_template.trim(),
    };
    if !configured.is_empty() {
        if let Some(text) = load_template_file(configured, ctx, user_agent, config.refresh)? {
            return Ok(text);
        }
        debug!(
            "Template '{}' not found in {}, using built-in",
            configured,
            ctx.template_dir.display()
        );
    }
    Ok(builtin_template(config.clash_type).to_string())
}

fn parse_template(text: &str) -> Result<Subscription, BuildError> {
    serde_yaml::from_str(text)
        .map_err(|e| BuildError::Template(format!("template is not a Clash document: {}", e)))
}

/// Build the Clash document described by `config`.
pub fn build_sub(config: &SubConfig, ctx: &BuildContext) -> Result<Subscription, BuildError> {
    config.validate()?;
    let name_rules = NameRules::compile(config.remove.as_deref(), &config.replace)?;

    let proxies = collect_proxies(config, ctx)?;
    let proxies = preprocess_nodes(proxies, &name_rules)?;

    let options = GroupOptions {
        clash_type: config.clash_type,
        autotest: config.autotest,
        lazy: config.lazy,
        udp: config.udp,
        sort: config.sort,
    };

    if config.node_list {
        let mut sub = Subscription::default();
        add_proxies(&mut sub, proxies, &options);
        info!("Built node list with {} proxies", sub.proxies.len());
        return Ok(Subscription::node_list(sub.proxies));
    }

    let template = parse_template(&resolve_template(config, ctx)?)?;
    let synthesized = synthesize(proxies, &options);
    let mut merged = merge_sub_and_template(template, &synthesized, config.ignore_country_group);
    add_rules(&mut merged, &config.rules);
    add_rule_providers(&mut merged, &config.rule_providers)?;

    info!(
        "Built {} config with {} proxies, {} groups, {} rules",
        match config.clash_type {
            ClashType::Clash => "clash",
            ClashType::Meta => "meta",
        },
        merged.proxies.len(),
        merged.proxy_groups.len(),
        merged.rules.len()
    );
    Ok(merged)
}

/// Build and serialize in one step.
pub fn render_sub(config: &SubConfig, ctx: &BuildContext) -> Result<String, BuildError> {
    Ok(build_sub(config, ctx)?.to_yaml()?)
}

/// `subscription-userinfo` of the only subscription in `config`.
///
/// Returns `None` unless exactly one subscription is configured.
pub fn probe_userinfo(config: &SubConfig, ctx: &BuildContext) -> Option<String> {
    match config.subs.as_slice() {
        [locator] => {
            let (url, _) = split_origin_tag(locator);
            ctx.loader
                .userinfo(url, effective_user_agent(config, ctx), ctx.retry_times)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::utils::cache::MemoryCacheStore;
    use crate::utils::http::Fetcher;

    struct Offline;

    impl Fetcher for Offline {
        fn get(&self, _url: &str, _user_agent: &str) -> Result<Vec<u8>, FetchError> {
            Err(FetchError::Network("offline".to_string()))
        }

        fn head_userinfo(
            &self,
            _url: &str,
            _user_agent: &str,
        ) -> Result<Option<String>, FetchError> {
            Err(FetchError::Network("offline".to_string()))
        }
    }

    fn context(dir: &Path) -> BuildContext {
        let loader = SubscriptionLoader::new(Box::new(Offline), Box::new(MemoryCacheStore::new()))
            .with_retry_delay(Duration::ZERO);
        BuildContext::new(loader).template_dir(dir)
    }

    fn request(template: Option<&str>) -> SubConfig {
        SubConfig {
            proxies: vec!["trojan://pw@hk.example.com:443#HK 01".to_string()],
            template: template.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_builtin_templates_parse() {
        for clash_type in [ClashType::Clash, ClashType::Meta] {
            let template = parse_template(builtin_template(clash_type)).unwrap();
            assert!(!template.proxy_groups.is_empty());
            assert!(template.rules.iter().any(|r| r.starts_with("MATCH,")));
        }
    }

    #[test]
    fn test_template_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mine.yaml"), "mode: global\n").unwrap();
        let ctx = context(dir.path());
        assert_eq!(
            resolve_template(&request(Some("mine.yaml")), &ctx).unwrap(),
            "mode: global\n"
        );
    }

    #[test]
    fn test_inline_template() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let text = resolve_template(&request(Some("mode%3A%20direct")), &ctx).unwrap();
        assert_eq!(text, "mode: direct");
    }

    #[test]
    fn test_missing_default_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let text = resolve_template(&request(None), &ctx).unwrap();
        assert_eq!(text, BUILTIN_META_TEMPLATE);

        let mut clash = request(None);
        clash.clash_type = ClashType::Clash;
        assert_eq!(resolve_template(&clash, &ctx).unwrap(), BUILTIN_CLASH_TEMPLATE);
    }

    #[test]
    fn test_remote_template_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path()).retry_times(1);
        let err = resolve_template(&request(Some("https://t.example/tpl.yaml")), &ctx).unwrap_err();
        assert!(matches!(err, BuildError::Fetch { .. }));
    }

    #[test]
    fn test_bad_pattern_fails_before_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let mut config = request(None);
        config.subs = vec!["https://a.example/sub".to_string()];
        config.remove = Some("(".to_string());
        let err = build_sub(&config, &ctx).unwrap_err();
        assert!(matches!(err, BuildError::Pattern { field: "remove", .. }));
    }
}
