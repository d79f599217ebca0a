use regex::Regex;

use crate::error::BuildError;
use crate::models::RenamePair;

/// Compiled removal and rename rules applied to proxy names.
///
/// Everything is compiled up front so a bad pattern fails the request before
/// any subscription is fetched.
#[derive(Debug, Clone, Default)]
pub struct NameRules {
    remove: Option<Regex>,
    renames: Vec<(Regex, String)>,
}

fn compile(field: &'static str, pattern: &str) -> Result<Regex, BuildError> {
    Regex::new(pattern).map_err(|source| BuildError::Pattern {
        field,
        pattern: pattern.to_string(),
        source,
    })
}

impl NameRules {
    pub fn compile(remove: Option<&str>, renames: &[RenamePair]) -> Result<Self, BuildError> {
        let remove = match remove.map(str::trim).filter(|p| !p.is_empty()) {
            Some(pattern) => Some(compile("remove", pattern)?),
            None => None,
        };
        let renames = renames
            .iter()
            .map(|pair| Ok((compile("replace", &pair.pattern)?, pair.replacement.clone())))
            .collect::<Result<Vec<_>, BuildError>>()?;
        Ok(NameRules { remove, renames })
    }

    /// Whether a proxy with this name should be dropped.
    pub fn is_removed(&self, name: &str) -> bool {
        self.remove.as_ref().is_some_and(|re| re.is_match(name))
    }

    /// Apply every rename in order; later rules see earlier output.
    pub fn rename(&self, name: &str) -> String {
        let mut name = name.to_string();
        for (pattern, replacement) in &self.renames {
            name = pattern.replace_all(&name, replacement.as_str()).into_owned();
        }
        name
    }
}
