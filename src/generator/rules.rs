//! Rule and rule-provider injection

use serde_yaml::{Mapping, Value};

use crate::error::BuildError;
use crate::models::{RuleEntry, RuleProvider, RuleProviderEntry, Subscription};

/// Splice `prepend` in front of the existing rules and `append` after them.
fn splice_rules(sub: &mut Subscription, prepend: Vec<String>, append: Vec<String>) {
    if !prepend.is_empty() {
        let existing = std::mem::take(&mut sub.rules);
        sub.rules = prepend;
        sub.rules.extend(existing);
    }
    sub.rules.extend(append);
}

/// Add extra rules; prepended ones keep their relative order as a block.
pub fn add_rules(sub: &mut Subscription, rules: &[RuleEntry]) {
    let (prepend, append): (Vec<_>, Vec<_>) = rules.iter().partition(|r| r.prepend);
    splice_rules(
        sub,
        prepend.into_iter().map(|r| r.rule.clone()).collect(),
        append.into_iter().map(|r| r.rule.clone()).collect(),
    );
}

/// Register rule providers and route each through a `RULE-SET` rule.
pub fn add_rule_providers(
    sub: &mut Subscription,
    providers: &[RuleProviderEntry],
) -> Result<(), BuildError> {
    let mut before = Mapping::new();
    let mut after = Mapping::new();
    let mut prepend_rules = Vec::new();
    let mut append_rules = Vec::new();

    for entry in providers {
        let provider = serde_yaml::to_value(RuleProvider::http(&entry.behavior, &entry.url))?;
        let rule = format!("RULE-SET,{},{}", entry.name, entry.group);
        let key = Value::String(entry.name.clone());
        if entry.prepend {
            before.insert(key, provider);
            prepend_rules.push(rule);
        } else {
            after.insert(key, provider);
            append_rules.push(rule);
        }
    }

    if !before.is_empty() {
        let existing = std::mem::take(&mut sub.rule_providers);
        sub.rule_providers = before;
        for (key, value) in existing {
            sub.rule_providers.entry(key).or_insert(value);
        }
    }
    for (key, value) in after {
        sub.rule_providers.insert(key, value);
    }

    splice_rules(sub, prepend_rules, append_rules);
    Ok(())
}
