//! Excluded-URL handling. A list of regex patterns can be supplied through
//! the environment as `{KEY}_EXCLUDED_URLS` (comma- or whitespace-separated);
//! requests whose path matches any pattern pass through the middleware
//! untouched.

use regex::RegexSet;

use crate::error::{MonitorError, MonitorResult};

/// Compiled set of path patterns to skip instrumenting.
#[derive(Clone, Debug, Default)]
pub struct ExcludedUrls {
    patterns: Option<RegexSet>,
}

impl ExcludedUrls {
    /// No exclusions; every path is instrumented.
    pub fn none() -> Self {
        Self { patterns: None }
    }

    /// Reads `{key}_EXCLUDED_URLS` (key upper-cased) from the environment.
    /// An unset or blank variable disables exclusion. Invalid patterns are a
    /// configuration error surfaced at setup time, not at request time.
    pub fn from_env(key: &str) -> MonitorResult<Self> {
        let variable = format!("{}_EXCLUDED_URLS", key.to_uppercase());
        match std::env::var(&variable) {
            Ok(raw) if !raw.trim().is_empty() => Self::from_patterns(
                raw.split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|pattern| !pattern.is_empty()),
            ),
            _ => Ok(Self::none()),
        }
    }

    /// Compiles an explicit pattern list.
    pub fn from_patterns<I, P>(patterns: I) -> MonitorResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|pattern| pattern.as_ref().to_owned())
            .collect();
        if patterns.is_empty() {
            return Ok(Self::none());
        }
        let set = RegexSet::new(&patterns).map_err(|error| {
            MonitorError::configuration(format!("invalid excluded-URL pattern: {error}"))
        })?;
        Ok(Self {
            patterns: Some(set),
        })
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        match &self.patterns {
            Some(set) => set.is_match(path),
            None => false,
        }
    }
}
