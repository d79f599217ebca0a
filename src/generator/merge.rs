//! Template merge
//!
//! Fills a template's group placeholders from the synthesized document and
//! then appends the synthesized proxies and groups to it.
//!
//! Placeholders are member tokens of the form `<key>`:
//!
//! - `<all>` expands to every proxy name
//! - `<countries>` expands to every country group name
//! - `<XX>` expands to the members of the country group for code `XX`
//!
//! Any other key expands to nothing.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::constants::country::find_by_code;
use crate::models::{ProxyGroup, Subscription};

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"<(.*?)>").unwrap();
}

fn country_members<'a>(sub: &'a Subscription, code: &str) -> &'a [String] {
    let Some(country) = find_by_code(code) else {
        return &[];
    };
    let group_name = country.group_name();
    sub.proxy_groups
        .iter()
        .find(|g| g.is_country_group && g.name == group_name)
        .map(|g| g.proxies.as_slice())
        .unwrap_or(&[])
}

fn expand_placeholder(key: &str, sub: &Subscription, ignore_country_group: bool) -> Vec<String> {
    match key {
        "all" => sub.proxies.iter().map(|p| p.name.clone()).collect(),
        "countries" if !ignore_country_group => sub
            .proxy_groups
            .iter()
            .filter(|g| g.is_country_group)
            .map(|g| g.name.clone())
            .collect(),
        code if code.chars().count() == 2 && !ignore_country_group => {
            country_members(sub, code).to_vec()
        }
        _ => {
            debug!("Placeholder <{}> expands to nothing", key);
            Vec::new()
        }
    }
}

fn expand_group(group: &mut ProxyGroup, sub: &Subscription, ignore_country_group: bool) {
    let mut members = Vec::with_capacity(group.proxies.len());
    for token in group.proxies.drain(..) {
        match PLACEHOLDER.captures(&token).and_then(|c| c.get(1)) {
            Some(key) => members.extend(expand_placeholder(
                key.as_str(),
                sub,
                ignore_country_group,
            )),
            None => members.push(token),
        }
    }
    group.proxies = members;
}

/// Merge the synthesized `sub` into `template` and return the template.
pub fn merge_sub_and_template(
    mut template: Subscription,
    sub: &Subscription,
    ignore_country_group: bool,
) -> Subscription {
    for group in template.proxy_groups.iter_mut() {
        if group.is_country_group {
            continue;
        }
        expand_group(group, sub, ignore_country_group);
    }

    template.proxies.extend(sub.proxies.iter().cloned());
    template.proxy_groups.extend(
        sub.proxy_groups
            .iter()
            .filter(|g| !ignore_country_group || !g.is_country_group)
            .cloned(),
    );
    template
}
