use std::fs;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use sub2clash::interfaces::{probe_userinfo, render_sub, BuildContext};
use sub2clash::models::sub_config::{
    parse_replace_list, parse_rule_list, parse_rule_provider_list,
};
use sub2clash::models::{ClashType, SortKey, SubConfig};
use sub2clash::settings::{update_settings_from_file, Settings};

/// Merge proxy subscriptions and links into a Clash configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path or URL of the settings file (YAML or TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// YAML file holding a full build request; flags below extend it
    #[arg(long, value_name = "FILE")]
    request: Option<String>,

    /// Subscription URL, optionally suffixed with #tag (repeatable)
    #[arg(long = "sub", value_name = "URL")]
    subs: Vec<String>,

    /// Inline proxy link (repeatable)
    #[arg(long = "proxy", value_name = "LINK")]
    proxies: Vec<String>,

    /// Template URL, file name in the template directory, or inline YAML
    #[arg(long, value_name = "TEMPLATE")]
    template: Option<String>,

    /// Drop proxies whose name matches this regex
    #[arg(long, value_name = "REGEX")]
    remove: Option<String>,

    /// Renames as [pattern,replacement],...
    #[arg(long, value_name = "PAIRS")]
    replace: Option<String>,

    /// Extra rules as [rule,prepend],...
    #[arg(long, value_name = "RULES")]
    rule: Option<String>,

    /// Rule providers as [behavior,url,group,prepend,name],...
    #[arg(long = "rule-provider", value_name = "PROVIDERS")]
    rule_provider: Option<String>,

    /// Group order: sizeasc, sizedesc, nameasc or namedesc
    #[arg(long, value_name = "KEY")]
    sort: Option<String>,

    /// Leave country groups out of the output
    #[arg(long)]
    ignore_country_group: bool,

    /// Bypass the response cache
    #[arg(long)]
    refresh: bool,

    /// User-Agent sent when fetching
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Make country groups url-test
    #[arg(long)]
    autotest: bool,

    /// Mark url-test groups lazy
    #[arg(long)]
    lazy: bool,

    /// Enable udp on every proxy
    #[arg(long)]
    udp: bool,

    /// Output only the proxy list
    #[arg(long)]
    node_list: bool,

    /// Output dialect: clash or meta
    #[arg(long, value_name = "TARGET")]
    target: Option<String>,

    /// Output file path, stdout when absent
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<String>,
}

impl Args {
    /// Fold the flags into a build request.
    fn into_request(self) -> Result<SubConfig> {
        let mut config = match &self.request {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read request file '{}'", path))?;
                serde_yaml::from_str(&content)
                    .with_context(|| format!("Failed to parse request file '{}'", path))?
            }
            None => SubConfig::default(),
        };

        config.subs.extend(self.subs);
        config.proxies.extend(self.proxies);
        if let Some(target) = &self.target {
            config.clash_type = ClashType::from_name(target)
                .ok_or_else(|| anyhow!("Unknown target '{}', expected clash or meta", target))?;
        }
        if self.template.is_some() {
            config.template = self.template;
        }
        if self.remove.is_some() {
            config.remove = self.remove;
        }
        if let Some(replace) = &self.replace {
            config.replace.extend(parse_replace_list(replace)?);
        }
        if let Some(rule) = &self.rule {
            config.rules.extend(parse_rule_list(rule)?);
        }
        if let Some(providers) = &self.rule_provider {
            config.rule_providers.extend(parse_rule_provider_list(providers)?);
        }
        if let Some(sort) = &self.sort {
            config.sort = SortKey::from_name(sort);
        }
        if self.user_agent.is_some() {
            config.user_agent = self.user_agent;
        }
        config.ignore_country_group |= self.ignore_country_group;
        config.refresh |= self.refresh;
        config.autotest |= self.autotest;
        config.lazy |= self.lazy;
        config.udp |= self.udp;
        config.node_list |= self.node_list;
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    if let Some(path) = &args.config {
        update_settings_from_file(path)
            .map_err(|e| anyhow!("Failed to load settings from '{}': {}", path, e))?;
    }
    let settings = Settings::current();

    // Initialize the logger
    env_logger::init_from_env(Env::default().default_filter_or(settings.log_level.as_str()));

    let output = args.output.clone();
    let config = args.into_request()?;
    let ctx = BuildContext::from_settings(&settings);

    if let Some(userinfo) = probe_userinfo(&config, &ctx) {
        info!("Subscription userinfo: {}", userinfo);
    }

    let content = render_sub(&config, &ctx)?;

    match output {
        Some(path) => {
            fs::write(&path, content)
                .with_context(|| format!("Failed to write output file '{}'", path))?;
            info!("Successfully wrote config to {}", path);
        }
        None => print!("{}", content),
    }
    Ok(())
}
