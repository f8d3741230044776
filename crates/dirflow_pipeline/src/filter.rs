//! Admission filter over file names

use crate::error::{FlowError, Result};
use crate::unit::UnitOfWork;
use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};

/// Configured admission rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionRule {
    /// Admit names ending with the given suffix (e.g. `.txt`)
    Suffix(String),
    /// Admit names matching a shell-style glob (e.g. `report-*.txt`)
    Glob(String),
}

impl Default for AdmissionRule {
    fn default() -> Self {
        AdmissionRule::Suffix(".txt".to_string())
    }
}

impl std::fmt::Display for AdmissionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionRule::Suffix(suffix) => write!(f, "suffix {:?}", suffix),
            AdmissionRule::Glob(pattern) => write!(f, "glob {:?}", pattern),
        }
    }
}

/// Compiled admission predicate. Total: never fails, only rejects.
#[derive(Debug, Clone)]
pub enum AdmissionFilter {
    Suffix(String),
    Glob(GlobMatcher),
}

impl AdmissionFilter {
    pub fn suffix(suffix: impl Into<String>) -> Self {
        AdmissionFilter::Suffix(suffix.into())
    }

    pub fn from_rule(rule: &AdmissionRule) -> Result<Self> {
        match rule {
            AdmissionRule::Suffix(suffix) => {
                if suffix.is_empty() {
                    return Err(FlowError::Config(
                        "admission suffix must not be empty".to_string(),
                    ));
                }
                Ok(AdmissionFilter::Suffix(suffix.clone()))
            }
            AdmissionRule::Glob(pattern) => {
                let glob = GlobBuilder::new(pattern)
                    .literal_separator(true)
                    .build()
                    .map_err(|e| {
                        FlowError::Config(format!("invalid admission glob '{}': {}", pattern, e))
                    })?;
                Ok(AdmissionFilter::Glob(glob.compile_matcher()))
            }
        }
    }

    pub fn admit(&self, unit: &UnitOfWork) -> bool {
        self.admits_name(unit.name())
    }

    pub fn admits_name(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        match self {
            AdmissionFilter::Suffix(suffix) => name.ends_with(suffix.as_str()),
            AdmissionFilter::Glob(matcher) => matcher.is_match(name),
        }
    }
}
