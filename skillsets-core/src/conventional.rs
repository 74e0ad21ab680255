//! Conventional Commits: `type(scope)!: description`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Types recognised when classifying commit intent.
pub const KNOWN_TYPES: &[&str] = &[
    "feat", "fix", "docs", "style", "refactor", "test", "chore", "perf", "ci", "build", "revert",
];

static CONVENTIONAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+)(?:\(([^)]+)\))?(!)?:\s*(.+)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalCommit {
    pub kind: String,
    pub scope: Option<String>,
    pub breaking: bool,
    pub description: String,
}

impl ConventionalCommit {
    /// Known types match regardless of case.
    pub fn is_known_type(&self) -> bool {
        KNOWN_TYPES.contains(&self.kind.to_lowercase().as_str())
    }
}

/// Parses a commit subject. The type keeps its case; a `!` before the colon or
/// anywhere in the description marks a breaking change and is removed from it.
pub fn parse(message: &str) -> Option<ConventionalCommit> {
    let caps = CONVENTIONAL_RE.captures(message.trim())?;

    let kind = caps.get(1)?.as_str().to_string();
    let scope = caps.get(2).map(|m| m.as_str().to_string());
    let mut description = caps.get(4)?.as_str().trim().to_string();
    let mut breaking = caps.get(3).is_some();

    if description.contains('!') {
        breaking = true;
        description = description.replace('!', "").trim().to_string();
    }

    Some(ConventionalCommit {
        kind,
        scope,
        breaking,
        description,
    })
}

/// The known conventional type of `message`, lowercased, if any.
pub fn known_type(message: &str) -> Option<String> {
    parse(message)
        .filter(|c| c.is_known_type())
        .map(|c| c.kind.to_lowercase())
}
