use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies which provider and model version produced a set of vectors.
///
/// Vectors from different tags are not comparable, so every table, search
/// function and evaluation label is derived from the tag rather than named
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTag {
    pub provider: String,
    pub version: String,
}

impl ModelTag {
    pub fn new(provider: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            version: version.into(),
        }
    }

    pub fn model_name(&self) -> String {
        format!("{}_{}", self.provider, self.version)
    }

    pub fn table_name(&self) -> String {
        format!("embed_{}", self.model_name())
    }

    pub fn search_function(&self) -> String {
        format!("search_{}", self.table_name())
    }
}

impl fmt::Display for ModelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.model_name())
    }
}
