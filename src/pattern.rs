//! Host pattern lists
//!
//! Exempt and always-block lists are written as shell-style globs
//! (`*.example.com`, `mail?.example.org`, `[ab].example.net`). Each
//! glob is compiled once into an anchored, case-insensitive regex.

use crate::error::{Error, Result};
use regex::{Regex, RegexBuilder};

/// A compiled list of host glob patterns.
///
/// # Examples
///
/// ```
/// use mailsieve::HostPatterns;
///
/// let exempt = HostPatterns::new(["gmail.com", "*.amazon.com"]).unwrap();
/// assert!(exempt.matches("gmail.com"));
/// assert!(exempt.matches("smtp.Amazon.com"));
/// assert!(!exempt.matches("amazon.com.evil.example"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct HostPatterns {
    patterns: Vec<(String, Regex)>,
}

impl HostPatterns {
    /// Compile a list of glob patterns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pattern`] if a pattern has an unterminated
    /// character class or otherwise fails to compile.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref().trim();
                compile(p).map(|re| (p.to_string(), re))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Parse a comma-separated list, ignoring empty entries.
    ///
    /// # Errors
    ///
    /// Same as [`HostPatterns::new`].
    pub fn parse_list(list: &str) -> Result<Self> {
        Self::new(list.split(',').map(str::trim).filter(|p| !p.is_empty()))
    }

    #[must_use]
    pub fn matches(&self, host: &str) -> bool {
        self.matching(host).is_some()
    }

    /// The first pattern that matches `host`.
    #[must_use]
    pub fn matching(&self, host: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(host))
            .map(|(p, _)| p.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}

/// Translate a glob into a regex. `*` and `?` never match `/`.
fn compile(glob: &str) -> Result<Regex> {
    let mut re = String::with_capacity(glob.len() * 2 + 2);
    re.push('^');
    let mut chars = glob.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            '[' => {
                re.push('[');
                let mut closed = false;
                let mut first = true;
                for c in chars.by_ref() {
                    match c {
                        ']' if !first => {
                            closed = true;
                            break;
                        }
                        '^' | '!' if first => re.push('^'),
                        '\\' => re.push_str("\\\\"),
                        '[' => re.push_str("\\["),
                        other => re.push(other),
                    }
                    first = false;
                }
                if !closed {
                    return Err(Error::Pattern(format!("{glob}: unterminated '['")));
                }
                re.push(']');
            }
            '\\' => match chars.next() {
                Some(escaped) => re.push_str(&regex::escape(&escaped.to_string())),
                None => return Err(Error::Pattern(format!("{glob}: trailing '\\'"))),
            },
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    RegexBuilder::new(&re)
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::Pattern(format!("{glob}: {e}")))
}
