//! Gitignore-style path filtering
//!
//! Supports the subset of `.gitignore` syntax used by firmware projects:
//! comments, negation with `!`, directory-only patterns ending in `/`,
//! anchored patterns containing a `/`, and `**` wildcards. Rules are
//! evaluated in order and the last matching rule wins. A directory that is
//! ignored hides everything below it.

use std::path::{Component, Path};

use glob::{MatchOptions, Pattern};

use crate::error::ConfigError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
struct IgnoreRule {
    /// Alternatives; the rule matches if any of them does
    patterns: Vec<Pattern>,
    negated: bool,
    dir_only: bool,
    anchored: bool,
}

impl IgnoreRule {
    fn parse(line: &str) -> Result<Option<Self>, ConfigError> {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (negated, body) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line.strip_prefix('\\').unwrap_or(line)),
        };
        let (dir_only, body) = match body.strip_suffix('/') {
            Some(rest) => (true, rest),
            None => (false, body),
        };

        // `**/name` is the same as an unanchored `name`
        let mut body = body;
        while let Some(rest) = body.strip_prefix("**/") {
            body = rest;
        }

        let anchored = body.contains('/');
        let body = body.trim_start_matches('/');
        if body.is_empty() {
            return Ok(None);
        }

        let mut sources = vec![body.to_string()];
        if anchored {
            // `a/**/b` must also match `a/b`
            if body.contains("/**/") {
                sources.push(body.replace("/**/", "/"));
            }
        }

        let patterns = sources
            .iter()
            .map(|source| {
                Pattern::new(source).map_err(|e| ConfigError::InvalidPattern {
                    pattern: line.to_string(),
                    error: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Self {
            patterns,
            negated,
            dir_only,
            anchored,
        }))
    }

    fn matches(&self, path: &str, name: &str, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        let candidate = if self.anchored { path } else { name };
        self.patterns
            .iter()
            .any(|p| p.matches_with(candidate, MATCH_OPTIONS))
    }
}

/// An ordered list of ignore rules
#[derive(Debug, Clone, Default)]
pub struct IgnoreSpec {
    rules: Vec<IgnoreRule>,
}

impl IgnoreSpec {
    /// Compile rules from lines, failing on the first invalid pattern
    pub fn from_lines<I, S>(lines: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for line in lines {
            if let Some(rule) = IgnoreRule::parse(line.as_ref())? {
                rules.push(rule);
            }
        }
        Ok(Self { rules })
    }

    /// Compile the contents of a `.gitignore` file
    ///
    /// Lines that do not compile are skipped with a warning, since the file
    /// is shared with git and may use syntax we do not model.
    pub fn from_gitignore(content: &str) -> Self {
        let mut rules = Vec::new();
        for line in content.lines() {
            match IgnoreRule::parse(line) {
                Ok(Some(rule)) => rules.push(rule),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping .gitignore line: {e}"),
            }
        }
        Self { rules }
    }

    /// Append the rules of `other` after this spec's rules
    #[must_use]
    pub fn chain(mut self, other: &IgnoreSpec) -> Self {
        self.rules.extend(other.rules.iter().cloned());
        self
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check whether a path relative to the ignore root is ignored
    pub fn is_ignored(&self, relative: &Path, is_dir: bool) -> bool {
        if self.rules.is_empty() {
            return false;
        }

        let components: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        for depth in 1..=components.len() {
            let is_last = depth == components.len();
            let prefix = components[..depth].join("/");
            let name = &components[depth - 1];
            let verdict = self.verdict(&prefix, name, !is_last || is_dir);

            if is_last {
                return verdict.unwrap_or(false);
            }
            if verdict == Some(true) {
                return true;
            }
        }

        false
    }

    /// Last matching rule decides: `Some(true)` ignored, `Some(false)` re-included
    fn verdict(&self, path: &str, name: &str, is_dir: bool) -> Option<bool> {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(path, name, is_dir))
            .map(|rule| !rule.negated)
    }
}
