//! Reserved names for nodes this system owns.

use serde::{Deserialize, Serialize};

/// Prefixes and suffixes that mark compositions and layers as managed.
///
/// Lookups are by exact name, so changing these between runs orphans the
/// nodes created under the old names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservedNames {
    /// Prefix of per-item child compositions (and their layer in the main composition).
    pub child_prefix: String,
    /// Prefix of the source layer inside a child composition.
    pub source_prefix: String,
    /// Suffix of the solid shown when footage is missing.
    pub placeholder_suffix: String,
}

impl Default for ReservedNames {
    fn default() -> Self {
        Self {
            child_prefix: "[AEB]_".to_string(),
            source_prefix: "[AEB]_src_".to_string(),
            placeholder_suffix: " (Missing)".to_string(),
        }
    }
}

impl ReservedNames {
    pub fn child_composition(&self, item: &str) -> String {
        format!("{}{}", self.child_prefix, item)
    }

    pub fn source_layer(&self, item: &str) -> String {
        format!("{}{}", self.source_prefix, item)
    }

    pub fn placeholder(&self, item: &str) -> String {
        format!("{}{}", item, self.placeholder_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names() {
        let names = ReservedNames::default();
        assert_eq!(names.child_composition("beauty"), "[AEB]_beauty");
        assert_eq!(names.source_layer("beauty"), "[AEB]_src_beauty");
        assert_eq!(names.placeholder("beauty"), "beauty (Missing)");
    }
}
