//! Post-processing of the aggregated proxy list
//!
//! Every function here is total over the list: it never fails on a single
//! record and keeps the relative order of the records it keeps.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::error::BuildError;
use crate::models::Proxy;
use crate::utils::matcher::NameRules;

/// Prefix the name of every tagged proxy with its origin tag.
pub fn qualify_names(nodes: &mut [Proxy]) {
    for node in nodes.iter_mut() {
        if let Some(tag) = &node.sub_name {
            node.name = format!("{} {}", tag.trim(), node.name.trim());
        }
    }
}

/// Drop exact duplicates, keeping the first occurrence.
///
/// Two proxies are duplicates when their serialized form is identical; the
/// origin tag is not part of that form, but the qualified name is.
pub fn dedup(nodes: Vec<Proxy>) -> Result<Vec<Proxy>, BuildError> {
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(nodes.len());
    for node in nodes {
        if seen.insert(node.canonical_form()?) {
            result.push(node);
        } else {
            debug!("Dropping duplicate proxy '{}'", node.name);
        }
    }
    Ok(result)
}

/// Drop proxies matched by the removal pattern.
pub fn filter_removed(nodes: Vec<Proxy>, rules: &NameRules) -> Vec<Proxy> {
    nodes
        .into_iter()
        .filter(|node| {
            let removed = rules.is_removed(&node.name);
            if removed {
                debug!("Removing proxy '{}'", node.name);
            }
            !removed
        })
        .collect()
}

pub fn rename_nodes(nodes: &mut [Proxy], rules: &NameRules) {
    for node in nodes.iter_mut() {
        node.name = rules.rename(&node.name);
    }
}

/// Make names unique: the Nth repeat of a name gets the suffix ` N`.
///
/// Suffixed names are not checked against names already in the list, so
/// `["a", "a", "a 1"]` becomes `["a", "a 1", "a 1"]`.
pub fn resolve_collisions(nodes: &mut [Proxy]) {
    let mut counters: HashMap<String, usize> = HashMap::new();
    for node in nodes.iter_mut() {
        match counters.get_mut(&node.name) {
            Some(count) => {
                *count += 1;
                node.name = format!("{} {}", node.name, count);
            }
            None => {
                counters.insert(node.name.clone(), 0);
            }
        }
    }
}

pub fn trim_names(nodes: &mut [Proxy]) {
    for node in nodes.iter_mut() {
        let trimmed = node.name.trim();
        if trimmed.len() != node.name.len() {
            node.name = trimmed.to_string();
        }
    }
}

/// Run the whole post-processing chain over freshly decoded proxies.
pub fn preprocess_nodes(mut nodes: Vec<Proxy>, rules: &NameRules) -> Result<Vec<Proxy>, BuildError> {
    qualify_names(&mut nodes);
    let nodes = dedup(nodes)?;
    let mut nodes = filter_removed(nodes, rules);
    rename_nodes(&mut nodes, rules);
    resolve_collisions(&mut nodes);
    trim_names(&mut nodes);
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProxyPayload, RenamePair, Trojan};

    fn trojan(name: &str, server: &str) -> Proxy {
        Proxy::new(
            name,
            ProxyPayload::Trojan(Trojan {
                server: server.to_string(),
                port: 443,
                password: "pw".to_string(),
                ..Default::default()
            }),
        )
    }

    fn names(nodes: &[Proxy]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_qualify_names() {
        let mut nodes = vec![trojan(" HK ", "a"), trojan("JP", "b")];
        nodes[0].sub_name = Some(" airport ".to_string());
        qualify_names(&mut nodes);
        assert_eq!(names(&nodes), vec!["airport HK", "JP"]);
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let nodes = vec![
            trojan("a", "1"),
            trojan("b", "2"),
            trojan("a", "1"),
            trojan("c", "3"),
            trojan("b", "2"),
        ];
        let nodes = dedup(nodes).unwrap();
        assert_eq!(names(&nodes), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_dedup_ignores_origin_tag() {
        let mut tagged = trojan("a", "1");
        tagged.sub_name = Some("x".to_string());
        let nodes = dedup(vec![trojan("a", "1"), tagged]).unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_dedup_compares_unmodelled_keys() {
        let yaml = r#"
- name: a
  type: vmess
  server: v.example.com
  port: 443
  uuid: 0b5a2c9e-2b7c-4d0a-9d3e-1f2a3b4c5d6e
  network: h2
  h2-opts:
    host: [cdn.example.com]
- name: a
  type: vmess
  server: v.example.com
  port: 443
  uuid: 0b5a2c9e-2b7c-4d0a-9d3e-1f2a3b4c5d6e
  network: h2
  h2-opts:
    host: [other.example.com]
"#;
        let nodes: Vec<Proxy> = serde_yaml::from_str(yaml).unwrap();
        let nodes = dedup(nodes).unwrap();
        assert_eq!(nodes.len(), 2);
        let text = nodes[1].canonical_form().unwrap();
        assert!(text.contains("h2-opts:"));
        assert!(text.contains("other.example.com"));
    }

    #[test]
    fn test_resolve_collisions_does_not_skip_taken_suffixes() {
        // counters are per original name, so a suffixed name already in the
        // list can be produced again
        let mut nodes = vec![trojan("a", "1"), trojan("a", "2"), trojan("a 1", "3")];
        resolve_collisions(&mut nodes);
        assert_eq!(names(&nodes), vec!["a", "a 1", "a 1"]);
    }

    #[test]
    fn test_resolve_collisions() {
        let mut nodes = vec![
            trojan("a", "1"),
            trojan("a", "2"),
            trojan("a", "3"),
            trojan("b", "4"),
        ];
        resolve_collisions(&mut nodes);
        assert_eq!(names(&nodes), vec!["a", "a 1", "a 2", "b"]);
    }

    #[test]
    fn test_preprocess_chain() {
        let rules = NameRules::compile(
            Some("^expire"),
            &[RenamePair {
                pattern: "IPLC".to_string(),
                replacement: "".to_string(),
            }],
        )
        .unwrap();
        let nodes = vec![
            trojan("expire 2030", "0"),
            trojan("HK IPLC", "1"),
            trojan("HK ", "2"),
        ];
        let nodes = preprocess_nodes(nodes, &rules).unwrap();
        // both rename to "HK " before collision handling, then get trimmed
        assert_eq!(names(&nodes), vec!["HK", "HK  1"]);
    }
}
