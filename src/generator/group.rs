//! Group generation utilities
//!
//! Builds one proxy group per country from the final proxy list and orders
//! the groups by the requested sort key.

use std::cmp::Ordering;

use log::debug;

use crate::constants::country::{classify, OTHER_GROUP};
use crate::models::{ClashType, Proxy, ProxyGroup, ProxyGroupType, SortKey, Subscription};

/// Health-check target used by `url-test` country groups.
pub const AUTOTEST_URL: &str = "http://www.gstatic.com/generate_204";
pub const AUTOTEST_INTERVAL: u32 = 300;
pub const AUTOTEST_TOLERANCE: u32 = 50;

/// Knobs for group synthesis.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupOptions {
    pub clash_type: ClashType,
    pub autotest: bool,
    pub lazy: bool,
    pub udp: bool,
    pub sort: SortKey,
}

fn country_group(name: &str, options: &GroupOptions) -> ProxyGroup {
    let mut group = if options.autotest {
        let mut group = ProxyGroup::new(name, ProxyGroupType::URLTest);
        group.url = Some(AUTOTEST_URL.to_string());
        group.interval = Some(AUTOTEST_INTERVAL);
        group.tolerance = Some(AUTOTEST_TOLERANCE);
        group.lazy = Some(options.lazy);
        group
    } else {
        ProxyGroup::new(name, ProxyGroupType::Select)
    };
    group.is_country_group = true;
    group
}

/// Append `proxies` to `sub`, filing each into its country group.
///
/// Proxies the target dialect cannot express are skipped.
pub fn add_proxies(sub: &mut Subscription, proxies: Vec<Proxy>, options: &GroupOptions) {
    for mut proxy in proxies {
        if !proxy.proxy_type().supports(options.clash_type) {
            debug!(
                "Skipping {} proxy '{}' unsupported by {:?}",
                proxy.proxy_type(),
                proxy.name,
                options.clash_type
            );
            continue;
        }
        if options.udp {
            proxy.udp = Some(true);
        }

        let group_name = match classify(&proxy.name) {
            Some(country) => country.group_name(),
            None => OTHER_GROUP.to_string(),
        };
        match sub.proxy_groups.iter_mut().find(|g| g.name == group_name) {
            Some(group) => group.proxies.push(proxy.name.clone()),
            None => {
                let mut group = country_group(&group_name, options);
                group.proxies.push(proxy.name.clone());
                sub.proxy_groups.push(group);
            }
        }
        sub.proxies.push(proxy);
    }
}

/// Stable sort of groups; ties keep their creation order.
pub fn sort_groups(groups: &mut [ProxyGroup], sort: SortKey) {
    let by_size = |a: &ProxyGroup, b: &ProxyGroup| a.size().cmp(&b.size());
    let by_name = |a: &ProxyGroup, b: &ProxyGroup| a.name.cmp(&b.name);
    groups.sort_by(|a, b| -> Ordering {
        match sort {
            SortKey::SizeAsc => by_size(a, b),
            SortKey::SizeDesc => by_size(b, a),
            SortKey::NameAsc => by_name(a, b),
            SortKey::NameDesc => by_name(b, a),
        }
    });
}

/// Build the proxy/group document handed to the template merge.
pub fn synthesize(proxies: Vec<Proxy>, options: &GroupOptions) -> Subscription {
    let mut sub = Subscription::default();
    add_proxies(&mut sub, proxies, options);
    sort_groups(&mut sub.proxy_groups, options.sort);
    sub
}
