//! Build stages that run after decoding: name post-processing, country
//! group synthesis, template merge and rule injection.

pub mod group;
pub mod merge;
pub mod node_manip;
pub mod rules;

pub use group::{add_proxies, sort_groups, synthesize, GroupOptions};
pub use merge::merge_sub_and_template;
pub use node_manip::preprocess_nodes;
pub use rules::{add_rule_providers, add_rules};
