use chrono::{DateTime, FixedOffset, NaiveDateTime};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::git;
use crate::models::{ChangeStatus, CommitRecord, ReportSection};
use crate::paths;
use crate::report::{human_size, pad, truncate_start, Report};
use crate::runner::CommandRunner;

pub const REPORT_FILE: &str = "code_churn_report.txt";

pub struct ChurnData {
    pub root: PathBuf,
    pub commits: Vec<CommitRecord>,
}

pub async fn fetch(runner: &dyn CommandRunner, days: i64) -> Result<ChurnData> {
    git::ensure_repo(runner).await?;
    let root = git::toplevel(runner).await?;

    let since = git::since_arg(days);
    let mut commits = git::log(runner, &[since.as_str(), "--name-status", "-m"]).await?;
    for commit in &mut commits {
        commit.files.retain(|f| !paths::is_excluded(&f.path));
    }

    Ok(ChurnData { root, commits })
}

/// Current size of a repository file, zero when it no longer exists.
pub fn size_on_disk(root: &Path) -> impl Fn(&str) -> u64 + '_ {
    move |path| std::fs::metadata(root.join(path)).map(|m| m.len()).unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct FileChurn {
    pub path: String,
    pub commits: usize,
    pub additions: usize,
    pub deletions: usize,
    pub modifications: usize,
    pub renames: usize,
    pub first_commit: Option<DateTime<FixedOffset>>,
    pub last_commit: Option<DateTime<FixedOffset>>,
    pub size: u64,
    pub authors: BTreeSet<String>,
    pub stability: u32,
}

impl FileChurn {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            commits: 0,
            additions: 0,
            deletions: 0,
            modifications: 0,
            renames: 0,
            first_commit: None,
            last_commit: None,
            size: 0,
            authors: BTreeSet::new(),
            stability: 100,
        }
    }

    fn stability_label(&self) -> String {
        let icon = if self.stability >= 80 {
            "🟢"
        } else if self.stability >= 50 {
            "🟡"
        } else {
            "🔴"
        };
        format!("{icon} {}", self.stability)
    }
}

/// 100 is untouched, 0 is constantly rewritten. The size penalty caps at 20
/// and the daily-rate penalty at 30.
pub fn stability_score(commits: usize, total_commits: usize, days_span: i64, size: u64) -> u32 {
    let total = total_commits.max(1) as f64;
    let churn_rate = commits as f64 / days_span.max(1) as f64;

    let base = 100.0 - commits as f64 / total * 50.0;
    let churn_penalty = (churn_rate * 100.0).min(30.0);
    let size_penalty = (size as f64 / 100_000.0 * 10.0).min(20.0);

    (base - churn_penalty - size_penalty).clamp(0.0, 100.0) as u32
}

#[derive(Debug, Clone)]
pub struct RiskFile {
    pub path: String,
    pub rate: f64,
    pub reasons: Vec<String>,
    pub commits: usize,
    pub authors: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionStat {
    pub extension: String,
    pub files: usize,
    pub commits: usize,
    pub total_size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ChurnAnalysis {
    pub window_days: i64,
    pub total_commits: usize,
    /// Sorted by commit count, busiest first.
    pub files: Vec<FileChurn>,
}

impl ChurnAnalysis {
    /// Files counted as high (≥80), medium (50–79) and low (<50) stability.
    pub fn distribution(&self) -> (usize, usize, usize) {
        let high = self.files.iter().filter(|f| f.stability >= 80).count();
        let medium = self
            .files
            .iter()
            .filter(|f| (50..80).contains(&f.stability))
            .count();
        (high, medium, self.files.len() - high - medium)
    }

    pub fn risk_files(&self) -> Vec<RiskFile> {
        let days = self.window_days.max(1) as f64;
        let mut risks: Vec<RiskFile> = self
            .files
            .iter()
            .filter_map(|f| {
                let rate = f.commits as f64 / days;
                let unstable = f.stability < 50 && rate > 0.1;
                let heavy = f.size > 50_000 && f.commits > 10;
                if !unstable && !heavy {
                    return None;
                }

                let mut reasons = Vec::new();
                if f.stability < 50 {
                    reasons.push(format!("low stability ({})", f.stability));
                }
                if rate > 0.1 {
                    reasons.push(format!("frequent changes ({rate:.2}/day)"));
                }
                if f.size > 50_000 {
                    reasons.push(format!("large file ({}KB)", f.size / 1024));
                }
                Some(RiskFile {
                    path: f.path.clone(),
                    rate,
                    reasons,
                    commits: f.commits,
                    authors: f.authors.len(),
                })
            })
            .collect();

        risks.sort_by(|a, b| b.rate.total_cmp(&a.rate).then_with(|| a.path.cmp(&b.path)));
        risks
    }

    pub fn extension_stats(&self) -> Vec<ExtensionStat> {
        let mut by_ext: HashMap<String, ExtensionStat> = HashMap::new();
        for f in &self.files {
            let ext = paths::extension(&f.path)
                .map(|e| format!(".{e}"))
                .unwrap_or_else(|| "(no extension)".to_string());
            let stat = by_ext.entry(ext.clone()).or_insert(ExtensionStat {
                extension: ext,
                files: 0,
                commits: 0,
                total_size: 0,
            });
            stat.files += 1;
            stat.commits += f.commits;
            stat.total_size += f.size;
        }

        let mut stats: Vec<ExtensionStat> = by_ext.into_values().collect();
        stats.sort_by(|a, b| {
            b.commits
                .cmp(&a.commits)
                .then_with(|| a.extension.cmp(&b.extension))
        });
        stats
    }

    pub fn total_by_status(&self) -> (usize, usize, usize) {
        self.files.iter().fold((0, 0, 0), |(a, m, d), f| {
            (a + f.additions, m + f.modifications, d + f.deletions)
        })
    }
}

pub fn analyze(
    commits: &[CommitRecord],
    window_days: i64,
    size_of: impl Fn(&str) -> u64,
) -> ChurnAnalysis {
    let mut analysis = ChurnAnalysis {
        window_days,
        total_commits: commits.len(),
        files: Vec::new(),
    };
    if commits.is_empty() {
        return analysis;
    }

    let oldest = commits.iter().map(|c| c.timestamp).min();
    let newest = commits.iter().map(|c| c.timestamp).max();
    let days_span = match (oldest, newest) {
        (Some(o), Some(n)) => (n - o).num_days().max(1),
        _ => 1,
    };

    let mut files: HashMap<String, FileChurn> = HashMap::new();
    for commit in commits {
        for change in &commit.files {
            if paths::is_excluded(&change.path) {
                continue;
            }
            let stat = files
                .entry(change.path.clone())
                .or_insert_with(|| FileChurn::new(&change.path));

            match change.status {
                ChangeStatus::Added => stat.additions += 1,
                ChangeStatus::Deleted => stat.deletions += 1,
                ChangeStatus::Modified => stat.modifications += 1,
                ChangeStatus::Renamed => stat.renames += 1,
                _ => {}
            }
            stat.commits += 1;
            stat.authors.insert(commit.author.clone());
            stat.first_commit = Some(stat.first_commit.map_or(commit.timestamp, |t| t.min(commit.timestamp)));
            stat.last_commit = Some(stat.last_commit.map_or(commit.timestamp, |t| t.max(commit.timestamp)));
        }
    }

    let total = commits.len();
    analysis.files = files
        .into_values()
        .map(|mut f| {
            f.size = size_of(&f.path);
            f.stability = stability_score(f.commits, total, days_span, f.size);
            f
        })
        .collect();
    analysis
        .files
        .sort_by(|a, b| b.commits.cmp(&a.commits).then_with(|| a.path.cmp(&b.path)));

    analysis
}

pub fn render(analysis: &ChurnAnalysis, generated_at: Option<NaiveDateTime>) -> Report {
    let mut report = Report::new("Code Churn Analysis").with_timestamp(generated_at);
    report.meta("Window", format!("last {} days", analysis.window_days));

    if analysis.total_commits == 0 {
        let mut empty = ReportSection::new("⚠️  No Data");
        empty.line("No commits found in the selected time window.");
        empty.blank();
        empty.line("Possible causes:");
        empty.line("  - the repository has no commits yet");
        empty.line("  - there was no activity in the window");
        report.push(empty);
        return report;
    }

    report
        .meta("Total commits", analysis.total_commits)
        .meta("Files touched", analysis.files.len());

    let (added, modified, deleted) = analysis.total_by_status();
    let (high, medium, low) = analysis.distribution();
    let mut summary = ReportSection::new("📊 Change Summary");
    summary.line(format!("Files added: {added}"));
    summary.line(format!("Modifications: {modified}"));
    summary.line(format!("Files deleted: {deleted}"));
    summary.blank();
    summary.line("Stability distribution:");
    summary.line(format!("  🟢 High (80-100): {high} files"));
    summary.line(format!("  🟡 Medium (50-79): {medium} files"));
    summary.line(format!("  🔴 Low (0-49): {low} files"));
    report.push(summary);

    let mut hot = ReportSection::new("🔥 Most Changed Files (Top 20)");
    hot.line(format!(
        "{} {} {} {} Authors",
        pad("Path", 50),
        pad("Commits", 8),
        pad("Stability", 10),
        pad("Size", 12)
    ));
    for f in analysis.files.iter().take(20) {
        hot.line(format!(
            "{} {} {} {} {}",
            pad(&truncate_start(&f.path, 48), 50),
            pad(&f.commits.to_string(), 8),
            pad(&f.stability_label(), 10),
            pad(&human_size(f.size), 12),
            f.authors.len()
        ));
    }
    report.push(hot);

    let risks = analysis.risk_files();
    let mut risk = ReportSection::new("⚠️  Risk Areas");
    if risks.is_empty() {
        risk.line("✅ No high-risk files found");
    } else {
        risk.line(format!("{} high-risk files:", risks.len()));
        risk.blank();
        for r in risks.iter().take(15) {
            risk.line(format!("  - {}", r.path));
            risk.line(format!("    Reasons: {}", r.reasons.join(", ")));
            risk.line(format!(
                "    Commits: {} | Authors: {}",
                r.commits, r.authors
            ));
            risk.blank();
        }
    }
    report.push(risk);

    let mut types = ReportSection::new("📁 By File Type");
    for stat in analysis.extension_stats().iter().take(10) {
        let avg = stat.total_size as f64 / stat.files.max(1) as f64;
        types.line(format!(
            "  {} files: {} | commits: {} | avg size: {:.1} KB",
            pad(&stat.extension, 20),
            pad(&stat.files.to_string(), 4),
            pad(&stat.commits.to_string(), 5),
            avg / 1024.0
        ));
    }
    report.push(types);

    let mut advice = ReportSection::new("💡 Recommendations");
    if low > 0 {
        advice.line("For low-stability files:");
        advice.line("  1. Review why they change so often");
        advice.line("  2. Consider a design that needs fewer edits");
        advice.line("  3. Add unit tests to make changes safer");
        advice.line("  4. Split complex modules");
        advice.blank();
    }
    if !risks.is_empty() {
        advice.line("For high-risk files:");
        advice.line("  1. Prioritise them in code review");
        advice.line("  2. Break them into smaller modules");
        advice.line("  3. Tighten test coverage");
        advice.line("  4. Plan technical debt work");
        advice.blank();
    }
    advice.line("General:");
    advice.line("  - Run this analysis regularly to track code health");
    advice.line("  - Pay extra attention to high-churn files in review");
    advice.line("  - Use feature flags to reduce direct edits");
    report.push(advice);

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::ScriptedRunner;
    use crate::skills::fixtures::{commit, hash};

    fn sample() -> Vec<CommitRecord> {
        vec![
            commit("c3", "bob", "2026-03-11T10:00:00+00:00", "")
                .with_file("src/app.rs", ChangeStatus::Modified)
                .with_file("node_modules/x/index.js", ChangeStatus::Modified),
            commit("c2", "alice", "2026-03-06T10:00:00+00:00", "")
                .with_file("src/app.rs", ChangeStatus::Modified)
                .with_file("docs/old.md", ChangeStatus::Deleted),
            commit("c1", "alice", "2026-03-01T10:00:00+00:00", "")
                .with_file("src/app.rs", ChangeStatus::Added)
                .with_file("docs/old.md", ChangeStatus::Added),
        ]
    }

    #[test]
    fn test_stability_score() {
        // 3/3 commits -> base 50; 3/10 per day -> 30 penalty; no size.
        assert_eq!(stability_score(3, 3, 10, 0), 20);
        assert_eq!(stability_score(1, 100, 90, 0), 98);
        assert_eq!(stability_score(50, 50, 1, 1_000_000), 0);
    }

    #[test]
    fn test_analyze_counts() {
        let analysis = analyze(&sample(), 90, |_| 2048);
        assert_eq!(analysis.total_commits, 3);
        assert_eq!(analysis.files.len(), 2);

        let app = &analysis.files[0];
        assert_eq!(app.path, "src/app.rs");
        assert_eq!(app.commits, 3);
        assert_eq!(app.additions, 1);
        assert_eq!(app.modifications, 2);
        assert_eq!(app.authors.len(), 2);
        assert_eq!(app.size, 2048);
        assert_eq!(app.stability, 19);

        let docs = &analysis.files[1];
        assert_eq!(docs.deletions, 1);
    }

    #[test]
    fn test_risk_files() {
        let analysis = analyze(&sample(), 10, |_| 0);
        let risks = analysis.risk_files();
        assert_eq!(risks.len(), 2);
        assert_eq!(risks[0].path, "src/app.rs");
        assert_eq!(risks[1].path, "docs/old.md");
        assert!(risks[0].reasons.iter().any(|r| r.starts_with("low stability")));
    }

    #[test]
    fn test_extension_stats() {
        let analysis = analyze(&sample(), 90, |_| 0);
        let stats = analysis.extension_stats();
        assert_eq!(stats[0].extension, ".rs");
        assert_eq!(stats[0].commits, 3);
        assert_eq!(stats[1].extension, ".md");
    }

    #[test]
    fn test_empty_window_report() {
        let analysis = analyze(&[], 90, |_| 0);
        let text = render(&analysis, None).render();
        assert!(text.contains("No commits found"));
    }

    #[test]
    fn test_render_lists_hot_files() {
        let analysis = analyze(&sample(), 90, |_| 0);
        let text = render(&analysis, None).render();
        assert!(text.contains("src/app.rs"));
        assert!(text.contains("🔴 20"));
    }

    #[test]
    fn test_size_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "12345").unwrap();
        let size = size_on_disk(dir.path());
        assert_eq!(size("a.txt"), 5);
        assert_eq!(size("missing.txt"), 0);
    }

    #[tokio::test]
    async fn test_fetch_filters_excluded() {
        let log = format!(
            "{}|alice|2026-03-01T10:00:00+00:00|init\nA\tsrc/lib.rs\nA\tvendor/dep.rs\n",
            hash("e1")
        );
        let runner = ScriptedRunner::git_repo()
            .on("git rev-parse --show-toplevel", "/repo\n")
            .on("git log", &log);
        let data = fetch(&runner, 30).await.unwrap();
        assert_eq!(data.root, PathBuf::from("/repo"));
        assert_eq!(data.commits[0].files.len(), 1);
        assert!(runner.called(&format!("git log {} --since=30 days ago --name-status -m", git::LOG_FORMAT)));
    }
}
