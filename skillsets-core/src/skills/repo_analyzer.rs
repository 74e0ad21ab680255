//! GitHub account inventory through the `gh` CLI: forks versus originals,
//! stale repositories, storage use and cleanup candidates.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::Result;
use crate::models::ReportSection;
use crate::report::{pad, percent, rule, truncate_end, Report};
use crate::runner::CommandRunner;
use crate::skills::ranked;

pub const REPORT_FILE: &str = "repos_analysis_report.txt";

const WIDTH: usize = 120;
const STALE_DAYS: i64 = 180;
const ABANDONED_DAYS: i64 = 365;
/// Originals smaller than this (in KB) are considered throwaway when abandoned.
const TINY_REPO_KB: u64 = 100;

const FIELDS: &str = "name,isFork,createdAt,updatedAt,pushedAt,diskUsage,stargazerCount,forkCount,primaryLanguage,description,url,visibility";

#[derive(Debug, Clone, Deserialize)]
pub struct Language {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub is_fork: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
    /// Kilobytes.
    #[serde(default)]
    pub disk_usage: u64,
    #[serde(default)]
    pub stargazer_count: u64,
    #[serde(default)]
    pub fork_count: u64,
    pub primary_language: Option<Language>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub visibility: Option<String>,
}

impl Repository {
    pub fn language(&self) -> &str {
        self.primary_language
            .as_ref()
            .map(|l| l.name.as_str())
            .unwrap_or("N/A")
    }

    pub fn has_traction(&self) -> bool {
        self.stargazer_count > 0 || self.fork_count > 0
    }

    pub fn updated(&self) -> NaiveDate {
        self.updated_at.date_naive()
    }

    fn description_or_na(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or("N/A")
    }
}

pub fn parse_repos(json: &str) -> Result<Vec<Repository>> {
    Ok(serde_json::from_str(json)?)
}

/// Lists up to 1000 repositories of the authenticated `gh` user. A missing
/// or unauthenticated `gh` is an error.
pub async fn fetch(runner: &dyn CommandRunner) -> Result<Vec<Repository>> {
    let out = runner
        .run_checked("gh", &["repo", "list", "--limit", "1000", "--json", FIELDS])
        .await?;
    let repos = parse_repos(&out)?;
    tracing::info!(count = repos.len(), "Fetched repositories");
    Ok(repos)
}

pub fn gigabytes(kb: u64) -> f64 {
    kb as f64 / (1024.0 * 1024.0)
}

#[derive(Debug, Clone, Default)]
pub struct GroupStats {
    pub count: usize,
    pub stale: usize,
    pub recent: usize,
    pub active: usize,
    pub inactive: usize,
    pub storage_kb: u64,
}

#[derive(Debug, Clone)]
pub struct RepoAnalysis {
    pub total: usize,
    pub forks: Vec<Repository>,
    /// Most recently updated first.
    pub originals: Vec<Repository>,
    pub fork_stats: GroupStats,
    pub original_stats: GroupStats,
    pub visibility: Vec<(String, usize)>,
    pub languages: Vec<(String, usize)>,
    pub fork_cleanup: Vec<Repository>,
    pub original_cleanup: Vec<Repository>,
    pub keep_forks: Vec<Repository>,
    pub keep_originals: Vec<Repository>,
}

impl RepoAnalysis {
    pub fn cleanup_count(&self) -> usize {
        self.fork_cleanup.len() + self.original_cleanup.len()
    }

    pub fn reclaimable_kb(&self) -> u64 {
        self.fork_cleanup
            .iter()
            .chain(&self.original_cleanup)
            .map(|r| r.disk_usage)
            .sum()
    }
}

fn group_stats(repos: &[Repository], stale_before: NaiveDate) -> GroupStats {
    let stale = repos.iter().filter(|r| r.updated() < stale_before).count();
    let active = repos.iter().filter(|r| r.has_traction()).count();
    GroupStats {
        count: repos.len(),
        stale,
        recent: repos.len() - stale,
        active,
        inactive: repos.len() - active,
        storage_kb: repos.iter().map(|r| r.disk_usage).sum(),
    }
}

pub fn analyze(repos: &[Repository], today: NaiveDate) -> RepoAnalysis {
    let stale_before = today - Duration::days(STALE_DAYS);
    let abandoned_before = today - Duration::days(ABANDONED_DAYS);

    let (forks, mut originals): (Vec<Repository>, Vec<Repository>) =
        repos.iter().cloned().partition(|r| r.is_fork);
    originals.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    let mut visibility: HashMap<String, usize> = HashMap::new();
    let mut languages: HashMap<String, usize> = HashMap::new();
    for r in repos {
        let v = r.visibility.clone().unwrap_or_else(|| "unknown".to_string());
        *visibility.entry(v.to_lowercase()).or_default() += 1;
        let lang = r
            .primary_language
            .as_ref()
            .map(|l| l.name.clone())
            .unwrap_or_else(|| "None".to_string());
        *languages.entry(lang).or_default() += 1;
    }

    let fork_cleanup = forks
        .iter()
        .filter(|r| r.updated() < stale_before && !r.has_traction())
        .cloned()
        .collect();
    let original_cleanup = originals
        .iter()
        .filter(|r| {
            r.updated() < abandoned_before && !r.has_traction() && r.disk_usage < TINY_REPO_KB
        })
        .cloned()
        .collect();

    let keep = |list: &[Repository]| -> Vec<Repository> {
        list.iter()
            .filter(|r| r.updated() >= stale_before || r.has_traction())
            .cloned()
            .collect()
    };

    RepoAnalysis {
        total: repos.len(),
        fork_stats: group_stats(&forks, stale_before),
        original_stats: group_stats(&originals, stale_before),
        visibility: ranked(&visibility),
        languages: ranked(&languages),
        keep_forks: keep(&forks),
        keep_originals: keep(&originals),
        fork_cleanup,
        original_cleanup,
        forks,
        originals,
    }
}

fn group_section(title: String, stats: &GroupStats, label: &str) -> ReportSection {
    let mut section = ReportSection::new(title);
    section.line("Age:");
    section.line(format!("  - not updated for 6+ months: {}", stats.stale));
    section.line(format!("  - updated within 6 months: {}", stats.recent));
    section.blank();
    section.line("Activity:");
    section.line(format!("  - with stars or forks: {}", stats.active));
    section.line(format!("  - without stars or forks: {}", stats.inactive));
    section.line(format!(
        "  - {label} storage: {:.2} GB",
        gigabytes(stats.storage_kb)
    ));
    section
}

pub fn render(analysis: &RepoAnalysis, generated_at: Option<NaiveDateTime>) -> Report {
    let mut report = Report::new("GitHub Repository Analysis")
        .with_width(WIDTH)
        .with_timestamp(generated_at);
    report
        .meta("Total repositories", analysis.total)
        .meta("  Forks", analysis.forks.len())
        .meta("  Originals", analysis.originals.len());

    let mut kinds = ReportSection::new("📊 Repository Mix");
    kinds.line("Visibility:");
    for (v, count) in &analysis.visibility {
        kinds.line(format!("  - {v}: {count}"));
    }
    kinds.blank();
    kinds.line("Languages (top 10):");
    for (lang, count) in analysis.languages.iter().take(10) {
        kinds.line(format!("  - {lang}: {count}"));
    }
    report.push(kinds);

    report.push(group_section(
        format!("🔴 Forks ({})", analysis.forks.len()),
        &analysis.fork_stats,
        "Fork",
    ));
    report.push(group_section(
        format!("🟢 Originals ({})", analysis.originals.len()),
        &analysis.original_stats,
        "Original",
    ));

    let mut list = ReportSection::new("📈 Originals by Last Update");
    list.line(format!(
        "{} {} {} {} {} Description",
        pad("Name", 30),
        pad("Updated", 12),
        pad("⭐", 4),
        pad("🍴", 4),
        pad("Language", 15)
    ));
    list.line(rule('-', WIDTH));
    for r in analysis.originals.iter().take(30) {
        list.line(format!(
            "{} {} {} {} {} {}",
            pad(&r.name, 30),
            pad(&r.updated().to_string(), 12),
            pad(&r.stargazer_count.to_string(), 4),
            pad(&r.fork_count.to_string(), 4),
            pad(r.language(), 15),
            truncate_end(r.description_or_na(), 40)
        ));
    }
    report.push(list);

    let forks_kb = analysis.fork_stats.storage_kb;
    let originals_kb = analysis.original_stats.storage_kb;
    let mut storage = ReportSection::new("💾 Storage");
    storage.line(format!("  - Forks: {:.2} GB", gigabytes(forks_kb)));
    storage.line(format!("  - Originals: {:.2} GB", gigabytes(originals_kb)));
    storage.line(format!("  - Total: {:.2} GB", gigabytes(forks_kb + originals_kb)));
    report.push(storage);

    let fork_kb: u64 = analysis.fork_cleanup.iter().map(|r| r.disk_usage).sum();
    let orig_kb: u64 = analysis.original_cleanup.iter().map(|r| r.disk_usage).sum();
    let mut cleanup = ReportSection::new("🎯 Cleanup Suggestions");
    cleanup.line("Forks:");
    cleanup.line(format!(
        "  - deletable: {} ({:.1}% of forks)",
        analysis.fork_cleanup.len(),
        percent(analysis.fork_cleanup.len(), analysis.forks.len())
    ));
    cleanup.line(format!("  - reclaimable: {:.2} GB", gigabytes(fork_kb)));
    cleanup.blank();
    cleanup.line("Originals:");
    cleanup.line(format!(
        "  - deletable: {} ({:.1}% of originals)",
        analysis.original_cleanup.len(),
        percent(analysis.original_cleanup.len(), analysis.originals.len())
    ));
    cleanup.line(format!("  - reclaimable: {:.2} GB", gigabytes(orig_kb)));
    cleanup.blank();
    cleanup.line("Overall:");
    cleanup.line(format!("  - deletable: {}", analysis.cleanup_count()));
    cleanup.line(format!(
        "  - reclaimable: {:.2} GB",
        gigabytes(analysis.reclaimable_kb())
    ));
    cleanup.line(format!(
        "  - remaining after cleanup: {}",
        analysis.total - analysis.cleanup_count()
    ));
    report.push(cleanup);

    let mut keep = ReportSection::new("✅ Worth Keeping");
    keep.line(format!("Forks ({}):", analysis.keep_forks.len()));
    for r in analysis.keep_forks.iter().take(10) {
        keep.line(format!(
            "  - {} | updated: {} | ⭐{} | 🍴{} | {}",
            pad(&r.name, 30),
            r.updated(),
            r.stargazer_count,
            r.fork_count,
            r.language()
        ));
    }
    keep.blank();
    keep.line(format!("Originals ({}):", analysis.keep_originals.len()));
    for r in analysis.keep_originals.iter().take(10) {
        keep.line(format!(
            "  - {} | updated: {} | ⭐{} | 🍴{} | {}",
            pad(&r.name, 30),
            r.updated(),
            r.stargazer_count,
            r.fork_count,
            truncate_end(r.description_or_na(), 35)
        ));
    }
    report.push(keep);

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::runner::fake::ScriptedRunner;

    const JSON: &str = r#"[
      {"name": "old-fork", "isFork": true, "createdAt": "2020-01-01T00:00:00Z",
       "updatedAt": "2021-01-01T00:00:00Z", "pushedAt": "2021-01-01T00:00:00Z",
       "diskUsage": 2048, "stargazerCount": 0, "forkCount": 0,
       "primaryLanguage": {"name": "Go"}, "description": "", "url": "https://github.com/u/old-fork",
       "visibility": "PUBLIC"},
      {"name": "fresh-fork", "isFork": true, "updatedAt": "2026-09-01T00:00:00Z",
       "diskUsage": 10, "stargazerCount": 0, "forkCount": 0,
       "primaryLanguage": null, "description": null, "visibility": "PUBLIC"},
      {"name": "tool", "isFork": false, "updatedAt": "2026-10-01T00:00:00Z",
       "diskUsage": 500, "stargazerCount": 12, "forkCount": 1,
       "primaryLanguage": {"name": "Rust"}, "description": "A handy tool", "visibility": "PUBLIC"},
      {"name": "scratch", "isFork": false, "updatedAt": "2024-01-01T00:00:00Z",
       "diskUsage": 20, "stargazerCount": 0, "forkCount": 0,
       "primaryLanguage": {"name": "Rust"}, "description": null, "visibility": "PRIVATE"}
    ]"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_parse_repos() {
        let repos = parse_repos(JSON).unwrap();
        assert_eq!(repos.len(), 4);
        assert!(repos[0].is_fork);
        assert_eq!(repos[0].language(), "Go");
        assert_eq!(repos[1].language(), "N/A");
        assert_eq!(repos[0].description_or_na(), "N/A");
    }

    #[test]
    fn test_analyze() {
        let analysis = analyze(&parse_repos(JSON).unwrap(), today());
        assert_eq!(analysis.forks.len(), 2);
        assert_eq!(analysis.originals[0].name, "tool");

        assert_eq!(analysis.fork_stats.stale, 1);
        assert_eq!(analysis.original_stats.active, 1);
        assert_eq!(analysis.fork_stats.storage_kb, 2058);

        let fork_names: Vec<&str> = analysis.fork_cleanup.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(fork_names, vec!["old-fork"]);
        assert_eq!(analysis.original_cleanup[0].name, "scratch");
        assert_eq!(analysis.cleanup_count(), 2);
        assert_eq!(analysis.reclaimable_kb(), 2068);

        assert_eq!(analysis.keep_forks.len(), 1);
        assert_eq!(analysis.keep_originals.len(), 1);
        assert_eq!(analysis.visibility[0], ("public".to_string(), 3));
        assert_eq!(analysis.languages[0], ("Rust".to_string(), 2));
    }

    #[test]
    fn test_render_without_forks() {
        let repos: Vec<Repository> = parse_repos(JSON)
            .unwrap()
            .into_iter()
            .filter(|r| !r.is_fork)
            .collect();
        let text = render(&analyze(&repos, today()), None).render();
        assert!(text.contains("deletable: 0 (0.0% of forks)"));
        assert!(text.contains("remaining after cleanup: 1"));
        assert!(text.contains("A handy tool"));
    }

    #[tokio::test]
    async fn test_fetch_requires_gh() {
        let runner = ScriptedRunner::new().missing("gh");
        assert!(matches!(fetch(&runner).await, Err(Error::ToolNotFound(_))));

        let runner = ScriptedRunner::new().fail("gh repo list", "gh auth login required");
        assert!(matches!(fetch(&runner).await, Err(Error::CommandFailed { .. })));

        let runner = ScriptedRunner::new().on("gh repo list --limit 1000", JSON);
        assert_eq!(fetch(&runner).await.unwrap().len(), 4);
    }
}
