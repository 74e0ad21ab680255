//! Keep a Changelog generation from tags and conventional commit subjects.

use std::collections::BTreeMap;

use crate::conventional;
use crate::error::Result;
use crate::git;
use crate::models::CommitRecord;
use crate::runner::CommandRunner;

pub const REPORT_FILE: &str = "CHANGELOG.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Added,
    Changed,
    Fixed,
    Removed,
    Security,
}

impl Category {
    pub const ORDER: [Category; 5] = [
        Category::Added,
        Category::Changed,
        Category::Fixed,
        Category::Removed,
        Category::Security,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Category::Added => "Added",
            Category::Changed => "Changed",
            Category::Fixed => "Fixed",
            Category::Removed => "Removed",
            Category::Security => "Security",
        }
    }

    /// Changelog category for a conventional commit type, matched case-sensitively.
    pub fn from_type(kind: &str) -> Self {
        match kind {
            "feat" => Category::Added,
            "fix" | "revert" => Category::Fixed,
            _ => Category::Changed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub hash: String,
    pub category: Category,
    pub scope: Option<String>,
    pub description: String,
    pub breaking: bool,
}

impl ChangelogEntry {
    pub fn from_commit(commit: &CommitRecord) -> Self {
        match conventional::parse(&commit.message) {
            Some(c) => Self {
                hash: commit.short_hash().to_string(),
                category: Category::from_type(&c.kind),
                scope: c.scope,
                description: c.description,
                breaking: c.breaking,
            },
            None => Self {
                hash: commit.short_hash().to_string(),
                category: Category::Changed,
                scope: None,
                description: commit.message.clone(),
                breaking: false,
            },
        }
    }

    pub fn to_markdown(&self) -> String {
        let breaking = if self.breaking {
            "**BREAKING CHANGE:** "
        } else {
            ""
        };
        let scope = self
            .scope
            .as_ref()
            .map(|s| format!("**{s}**: "))
            .unwrap_or_default();
        format!("- {breaking}{scope}{} ({})", self.description, self.hash)
    }
}

#[derive(Debug, Clone)]
pub struct Release {
    pub version: String,
    pub date: Option<String>,
    pub entries: Vec<ChangelogEntry>,
}

impl Release {
    pub fn to_markdown(&self) -> String {
        let mut lines = vec![
            format!(
                "## [{}] - {}",
                self.version,
                self.date.as_deref().unwrap_or("Unreleased")
            ),
            String::new(),
        ];

        for category in Category::ORDER {
            let entries: Vec<&ChangelogEntry> = self
                .entries
                .iter()
                .filter(|e| e.category == category)
                .collect();
            if entries.is_empty() {
                continue;
            }
            lines.push(format!("### {}", category.as_str()));
            lines.push(String::new());
            lines.extend(entries.iter().map(|e| e.to_markdown()));
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Changelog {
    /// Tags oldest first.
    pub tags: Vec<String>,
    /// Tagged releases, oldest first; tags without new commits are omitted.
    pub releases: Vec<Release>,
    pub unreleased: Vec<ChangelogEntry>,
}

impl Changelog {
    pub fn unreleased_counts(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.unreleased {
            *counts.entry(e.category).or_default() += 1;
        }
        counts
    }

    pub fn to_markdown(&self) -> String {
        let mut lines = vec!["# Changelog".to_string(), String::new()];
        lines.push("All notable changes to this project are documented in this file.".to_string());
        lines.push(String::new());

        if self.tags.is_empty() {
            lines.push(
                "⚠️  No version tags found; consider tagging releases with semantic versions (e.g. v1.0.0)."
                    .to_string(),
            );
            lines.push(String::new());
            lines.push("---".to_string());
            lines.push(String::new());
            let all = Release {
                version: "All Commits".to_string(),
                date: None,
                entries: self.unreleased.clone(),
            };
            lines.push(all.to_markdown());
            if self.unreleased.is_empty() {
                lines.push("_No commits yet._".to_string());
                lines.push(String::new());
            }
            return lines.join("\n");
        }

        lines.push(
            "The format is based on [Keep a Changelog](https://keepachangelog.com/en/1.0.0/),"
                .to_string(),
        );
        lines.push(
            "and this project adheres to [Semantic Versioning](https://semver.org/spec/v2.0.0.html)."
                .to_string(),
        );
        lines.push(String::new());
        lines.push("---".to_string());
        lines.push(String::new());

        if !self.unreleased.is_empty() {
            let unreleased = Release {
                version: "Unreleased".to_string(),
                date: None,
                entries: self.unreleased.clone(),
            };
            lines.push(unreleased.to_markdown());
        }
        for release in self.releases.iter().rev() {
            lines.push(release.to_markdown());
        }

        lines.join("\n")
    }
}

/// `git tag -l --sort=-v:refname` lists newest first; returns oldest first.
pub fn parse_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();
    tags.reverse();
    tags
}

async fn entries(runner: &dyn CommandRunner, range: &str) -> Result<Vec<ChangelogEntry>> {
    let commits = git::log(runner, &[range]).await?;
    Ok(commits.iter().map(ChangelogEntry::from_commit).collect())
}

async fn tag_date(runner: &dyn CommandRunner, tag: &str) -> Result<Option<String>> {
    let output = runner
        .run("git", &["log", "-1", "--format=%ad", "--date=short", tag])
        .await?;
    let date = output.stdout.trim();
    Ok((output.success && !date.is_empty()).then(|| date.to_string()))
}

pub async fn fetch(runner: &dyn CommandRunner) -> Result<Changelog> {
    git::ensure_repo(runner).await?;

    if !git::has_commits(runner).await? {
        tracing::warn!("Repository has no commits yet");
        return Ok(Changelog::default());
    }

    let output = runner.run("git", &["tag", "-l", "--sort=-v:refname"]).await?;
    let tags = if output.success {
        parse_tags(&output.stdout)
    } else {
        Vec::new()
    };

    let mut changelog = Changelog {
        tags: tags.clone(),
        ..Default::default()
    };

    if tags.is_empty() {
        changelog.unreleased = entries(runner, "HEAD").await?;
        return Ok(changelog);
    }

    let mut prev: Option<&str> = None;
    for tag in &tags {
        let range = match prev {
            Some(p) => format!("{p}..{tag}"),
            None => tag.clone(),
        };
        let found = entries(runner, &range).await?;
        if !found.is_empty() {
            changelog.releases.push(Release {
                version: tag.clone(),
                date: tag_date(runner, tag).await?,
                entries: found,
            });
        }
        prev = Some(tag);
    }

    if let Some(last) = prev {
        changelog.unreleased = entries(runner, &format!("{last}..HEAD")).await?;
    }

    Ok(changelog)
}
