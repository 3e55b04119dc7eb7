//! Glob patterns over storage keys
//!
//! `*` matches inside one path segment, `**` matches any number of segments
//! and `?` matches one character other than `/`. Everything else is literal.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Pattern used when a root has none configured
pub const DEFAULT_PATTERN: &str = "**/*.json";

static DEFAULT: Lazy<PathPattern> =
    Lazy::new(|| PathPattern::new(DEFAULT_PATTERN).expect("default pattern compiles"));

/// A compiled glob over relative keys
#[derive(Debug, Clone)]
pub struct PathPattern {
    glob: String,
    regex: Regex,
}

impl PathPattern {
    /// Compile a glob
    pub fn new(glob: &str) -> Result<Self> {
        let glob = glob.trim().trim_start_matches('/');
        if glob.is_empty() {
            return Err(Error::pattern(glob, "pattern is empty"));
        }

        let regex = Regex::new(&glob_to_regex(glob))
            .map_err(|e| Error::pattern(glob, e.to_string()))?;

        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    /// Compile an optional glob, falling back to [`DEFAULT_PATTERN`]
    pub fn or_default(glob: Option<&str>) -> Result<Self> {
        glob.map_or_else(|| Ok(Self::default()), Self::new)
    }

    /// The source glob
    pub fn as_str(&self) -> &str {
        &self.glob
    }

    /// Whether a relative key matches
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

impl Default for PathPattern {
    fn default() -> Self {
        DEFAULT.clone()
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.glob)
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');

    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("*.json", "2018-11-01-events.json", true ; "single segment")]
    #[test_case("*.json", "2018/11-01-events.json", false ; "star stops at slash")]
    #[test_case("*/*/*/*.json", "A/A/B/TRAABJL12903CDCF1A.json", true ; "catalog layout")]
    #[test_case("*/*/*/*.json", "A/A/TRAABJL12903CDCF1A.json", false ; "catalog layout too shallow")]
    #[test_case("**/*.json", "top.json", true ; "globstar matches zero segments")]
    #[test_case("**/*.json", "a/b/c/deep.json", true ; "globstar matches many segments")]
    #[test_case("**/*.json", "a/b/c/deep.jsonl", false ; "suffix anchored")]
    #[test_case("log-??.json", "log-01.json", true ; "question mark")]
    #[test_case("a.b/*.json", "axb/x.json", false ; "dot is literal")]
    fn test_matches(glob: &str, key: &str, expected: bool) {
        assert_eq!(PathPattern::new(glob).unwrap().matches(key), expected);
    }

    #[test]
    fn test_default_pattern() {
        let pattern = PathPattern::or_default(None).unwrap();
        assert_eq!(pattern.as_str(), DEFAULT_PATTERN);
        assert!(pattern.matches("x/y.json"));
        assert!(!pattern.matches("x/_manifest.txt"));
    }

    #[test]
    fn test_leading_slash_ignored() {
        let pattern = PathPattern::new("/*.json").unwrap();
        assert!(pattern.matches("events.json"));
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(matches!(
            PathPattern::new("  ").unwrap_err(),
            Error::Pattern { .. }
        ));
    }
}
