use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::error::Result;
use crate::git;
use crate::models::ReportSection;
use crate::report::{pad, Report};
use crate::runner::CommandRunner;

use super::ranked;

pub const REPORT_FILE: &str = "branch_hygiene_report.txt";

/// Accepted branch name prefixes and what they denote.
pub const NAMING_CONVENTIONS: &[(&str, &str)] = &[
    ("feature/", "Feature branch"),
    ("bugfix/", "Bug fix branch"),
    ("hotfix/", "Hotfix branch"),
    ("release/", "Release branch"),
    ("develop", "Development branch"),
    ("main", "Main branch"),
    ("master", "Main branch"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub name: String,
    pub last_commit: Option<NaiveDate>,
    pub commits: usize,
    pub merged: bool,
    pub convention: Option<&'static str>,
}

impl BranchInfo {
    pub fn follows_convention(&self) -> bool {
        self.convention.is_some()
    }

    fn last_commit_label(&self) -> String {
        self.last_commit
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct BranchData {
    pub main_branch: String,
    pub total: usize,
    pub branches: Vec<BranchInfo>,
}

/// Branch names from `git branch -a`: remote prefixes and the current-branch
/// marker removed, `origin/HEAD` dropped, deduplicated and sorted.
pub fn parse_branch_list(text: &str) -> Vec<String> {
    let mut names = BTreeSet::new();

    for raw in text.lines() {
        let mut line = raw.trim();
        if line.is_empty() || line.starts_with("remotes/origin/HEAD") {
            continue;
        }
        if let Some(rest) = line.strip_prefix("* ") {
            line = rest.trim();
        }
        if let Some(rest) = line.strip_prefix("remotes/origin/") {
            line = rest;
        }
        // Detached HEAD shows up as "(HEAD detached at ...)".
        if line.is_empty() || line.starts_with('(') {
            continue;
        }
        names.insert(line.to_string());
    }

    names.into_iter().collect()
}

pub fn parse_merged(text: &str) -> HashSet<String> {
    text.lines()
        .map(|l| l.trim().trim_start_matches("* ").trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

pub fn naming_convention(name: &str) -> Option<&'static str> {
    NAMING_CONVENTIONS
        .iter()
        .find(|(prefix, _)| name == *prefix || name.starts_with(prefix))
        .map(|(_, description)| *description)
}

/// Date part of `git log --format=%ci`.
pub fn parse_commit_date(text: &str) -> Option<NaiveDate> {
    let first = text.split_whitespace().next()?;
    NaiveDate::parse_from_str(first, "%Y-%m-%d").ok()
}

async fn succeeds(runner: &dyn CommandRunner, args: &[&str]) -> Result<bool> {
    Ok(runner.run("git", args).await?.success)
}

pub async fn main_branch(runner: &dyn CommandRunner) -> Result<String> {
    for candidate in ["main", "master"] {
        if succeeds(runner, &["rev-parse", "--verify", candidate]).await? {
            return Ok(candidate.to_string());
        }
    }

    let output = runner
        .run("git", &["symbolic-ref", "refs/remotes/origin/HEAD"])
        .await?;
    if output.success {
        let name = output.stdout.trim().trim_start_matches("refs/remotes/origin/");
        if !name.is_empty() {
            return Ok(name.to_string());
        }
    }

    Ok("main".to_string())
}

/// Output of `git <args> <branch>`, retried against `origin/<branch>` for
/// branches that only exist on the remote.
async fn branch_query(
    runner: &dyn CommandRunner,
    args: &[&str],
    branch: &str,
) -> Result<Option<String>> {
    let remote = format!("origin/{branch}");
    for target in [branch, remote.as_str()] {
        let mut full = args.to_vec();
        full.push(target);
        let output = runner.run("git", &full).await?;
        if output.success && !output.stdout.trim().is_empty() {
            return Ok(Some(output.stdout.trim().to_string()));
        }
    }
    Ok(None)
}

pub async fn fetch(runner: &dyn CommandRunner) -> Result<BranchData> {
    git::ensure_repo(runner).await?;

    let listing = runner.run_checked("git", &["branch", "-a"]).await?;
    let names = parse_branch_list(&listing);
    let main_branch = main_branch(runner).await?;

    let current = runner
        .run("git", &["rev-parse", "--abbrev-ref", "HEAD"])
        .await?;
    let current = current.success.then(|| current.stdout.trim().to_string());

    let merged_out = runner
        .run("git", &["branch", "--merged", main_branch.as_str()])
        .await?;
    let merged_set = if merged_out.success {
        parse_merged(&merged_out.stdout)
    } else {
        HashSet::new()
    };

    let mut branches = Vec::new();
    for name in &names {
        if *name == main_branch {
            continue;
        }
        debug!(branch = %name, "Inspecting branch");

        let last_commit = branch_query(runner, &["log", "-1", "--format=%ci"], name)
            .await?
            .and_then(|s| parse_commit_date(&s));
        let commits = branch_query(runner, &["rev-list", "--count"], name)
            .await?
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let merged = current.as_deref() != Some(name.as_str()) && merged_set.contains(name);

        branches.push(BranchInfo {
            name: name.clone(),
            last_commit,
            commits,
            merged,
            convention: naming_convention(name),
        });
    }

    Ok(BranchData {
        main_branch,
        total: names.len(),
        branches,
    })
}

#[derive(Debug, Clone)]
pub struct BranchAnalysis {
    pub main_branch: String,
    pub total: usize,
    pub zombie_days: i64,
    pub zombie: Vec<BranchInfo>,
    pub merged: Vec<BranchInfo>,
    pub naming_issues: Vec<BranchInfo>,
    pub active: Vec<BranchInfo>,
    pub details: Vec<BranchInfo>,
}

impl BranchAnalysis {
    fn is_zombie(&self, name: &str) -> bool {
        self.zombie.iter().any(|b| b.name == name)
    }

    /// Merged and inactive: safe to force-delete.
    pub fn high_priority(&self) -> Vec<&BranchInfo> {
        sorted_by_name(self.merged.iter().filter(|b| self.is_zombie(&b.name)))
    }

    /// Merged but still recent.
    pub fn medium_priority(&self) -> Vec<&BranchInfo> {
        sorted_by_name(self.merged.iter().filter(|b| !self.is_zombie(&b.name)))
    }

    /// Inactive with unmerged work.
    pub fn low_priority(&self) -> Vec<&BranchInfo> {
        sorted_by_name(self.zombie.iter().filter(|b| !b.merged))
    }

    pub fn convention_counts(&self) -> Vec<(&'static str, usize)> {
        let mut counts: HashMap<&'static str, usize> = HashMap::new();
        for b in &self.details {
            if let Some(c) = b.convention {
                *counts.entry(c).or_default() += 1;
            }
        }
        ranked(&counts)
    }
}

fn sorted_by_name<'a>(iter: impl Iterator<Item = &'a BranchInfo>) -> Vec<&'a BranchInfo> {
    let mut v: Vec<&BranchInfo> = iter.collect();
    v.sort_by(|a, b| a.name.cmp(&b.name));
    v
}

pub fn analyze(data: &BranchData, today: NaiveDate, zombie_days: i64) -> BranchAnalysis {
    let threshold = today - Duration::days(zombie_days);

    let mut analysis = BranchAnalysis {
        main_branch: data.main_branch.clone(),
        total: data.total,
        zombie_days,
        zombie: Vec::new(),
        merged: Vec::new(),
        naming_issues: Vec::new(),
        active: Vec::new(),
        details: data.branches.clone(),
    };

    for branch in &data.branches {
        match branch.last_commit {
            Some(d) if d < threshold => analysis.zombie.push(branch.clone()),
            Some(_) => analysis.active.push(branch.clone()),
            None => {}
        }
        if branch.merged {
            analysis.merged.push(branch.clone());
        }
        if !branch.follows_convention() {
            analysis.naming_issues.push(branch.clone());
        }
    }

    analysis.details.sort_by(|a, b| a.name.cmp(&b.name));
    analysis.zombie.sort_by_key(|b| b.last_commit);
    analysis
        .merged
        .sort_by(|a, b| b.last_commit.cmp(&a.last_commit));
    analysis
        .active
        .sort_by(|a, b| b.last_commit.cmp(&a.last_commit));
    analysis.naming_issues.sort_by(|a, b| a.name.cmp(&b.name));
    analysis
}

fn branch_table(section: &mut ReportSection, branches: &[BranchInfo]) {
    section.line(format!(
        "{} {} {} Naming",
        pad("Branch", 40),
        pad("Last commit", 15),
        pad("Commits", 8)
    ));
    for b in branches {
        section.line(format!(
            "{} {} {} {}",
            pad(&b.name, 40),
            pad(&b.last_commit_label(), 15),
            pad(&b.commits.to_string(), 8),
            if b.follows_convention() { "✅" } else { "❌" }
        ));
    }
}

fn name_list(section: &mut ReportSection, branches: &[&BranchInfo]) {
    for b in branches {
        section.line(format!("  - {}", b.name));
    }
}

fn names(branches: &[&BranchInfo]) -> String {
    branches
        .iter()
        .map(|b| b.name.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render(analysis: &BranchAnalysis, generated_at: Option<NaiveDateTime>) -> Report {
    let mut report = Report::new("Branch Hygiene Report").with_timestamp(generated_at);
    report
        .meta("Main branch", &analysis.main_branch)
        .meta("Total branches", analysis.total);

    let days = analysis.zombie_days;

    let mut zombie = ReportSection::new(format!("🧟 Zombie Branches (no activity for {days} days)"));
    zombie.line(format!("Zombie branches: {}", analysis.zombie.len()));
    if !analysis.zombie.is_empty() {
        zombie.blank();
        branch_table(&mut zombie, &analysis.zombie);
    }
    report.push(zombie);

    let mut merged = ReportSection::new("✅ Merged Branches");
    merged.line(format!("Merged branches: {}", analysis.merged.len()));
    if !analysis.merged.is_empty() {
        merged.blank();
        merged.line("Merged branches (safe to delete):");
        branch_table(&mut merged, &analysis.merged);
    }
    report.push(merged);

    let mut naming = ReportSection::new("📝 Naming Conventions");
    naming.line("Convention distribution:");
    for (convention, count) in analysis.convention_counts() {
        naming.line(format!("  - {convention}: {count}"));
    }
    naming.blank();
    naming.line(format!(
        "Branches not following a convention: {}",
        analysis.naming_issues.len()
    ));
    for b in &analysis.naming_issues {
        naming.line(format!("  - {}", b.name));
    }
    report.push(naming);

    let mut active = ReportSection::new(format!("🟢 Active Branches (activity within {days} days)"));
    active.line(format!("Active branches: {}", analysis.active.len()));
    if !analysis.active.is_empty() {
        active.blank();
        branch_table(&mut active, &analysis.active);
    }
    report.push(active);

    let high = analysis.high_priority();
    let medium = analysis.medium_priority();
    let low = analysis.low_priority();

    let mut cleanup = ReportSection::new("🎯 Cleanup Recommendations");
    cleanup.line(format!("🔴 High priority (merged and inactive): {}", high.len()));
    name_list(&mut cleanup, &high);
    cleanup.blank();
    cleanup.line(format!("🟡 Medium priority (merged): {}", medium.len()));
    name_list(&mut cleanup, &medium);
    cleanup.blank();
    cleanup.line(format!(
        "🟢 Low priority (inactive, not merged - check for unmerged work): {}",
        low.len()
    ));
    name_list(&mut cleanup, &low);
    report.push(cleanup);

    let mut commands = ReportSection::new("🔧 Cleanup Commands");
    if high.is_empty() && medium.is_empty() {
        commands.line("Nothing to clean up.");
    }
    if !high.is_empty() {
        commands.line("# High priority (merged and inactive):");
        commands.line(format!("git branch -D {}", names(&high)));
    }
    if !medium.is_empty() {
        if !high.is_empty() {
            commands.blank();
        }
        commands.line("# Medium priority (merged):");
        commands.line(format!("git branch -d {}", names(&medium)));
    }
    report.push(commands);

    let mut details = ReportSection::new("📊 Branch Details");
    details.line(format!(
        "{} {} {} {} Naming",
        pad("Branch", 40),
        pad("Last commit", 15),
        pad("Commits", 8),
        pad("Merged", 8)
    ));
    for b in &analysis.details {
        details.line(format!(
            "{} {} {} {} {}",
            pad(&b.name, 40),
            pad(&b.last_commit_label(), 15),
            pad(&b.commits.to_string(), 8),
            pad(if b.merged { "yes" } else { "no" }, 8),
            b.convention.unwrap_or("❌ non-conforming")
        ));
    }
    report.push(details);

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::ScriptedRunner;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn branch(name: &str, last: &str, merged: bool) -> BranchInfo {
        BranchInfo {
            name: name.to_string(),
            last_commit: Some(date(last)),
            commits: 3,
            merged,
            convention: naming_convention(name),
        }
    }

    #[test]
    fn test_parse_branch_list() {
        let text = "\
* main
  feature/login
  remotes/origin/HEAD -> origin/main
  remotes/origin/main
  remotes/origin/feature/login
  remotes/origin/old-stuff
";
        assert_eq!(
            parse_branch_list(text),
            vec!["feature/login", "main", "old-stuff"]
        );
    }

    #[test]
    fn test_naming_convention() {
        assert_eq!(naming_convention("feature/x"), Some("Feature branch"));
        assert_eq!(naming_convention("develop"), Some("Development branch"));
        assert_eq!(naming_convention("wip-thing"), None);
    }

    #[test]
    fn test_parse_commit_date() {
        assert_eq!(
            parse_commit_date("2026-01-30 19:58:09 +0800"),
            Some(date("2026-01-30"))
        );
        assert_eq!(parse_commit_date("garbage"), None);
    }

    #[test]
    fn test_priorities() {
        let data = BranchData {
            main_branch: "main".into(),
            total: 4,
            branches: vec![
                branch("feature/old-merged", "2025-01-01", true),
                branch("feature/new-merged", "2026-10-01", true),
                branch("spike", "2025-02-01", false),
            ],
        };
        let analysis = analyze(&data, date("2026-10-19"), 90);

        assert_eq!(analysis.zombie.len(), 2);
        assert_eq!(analysis.active.len(), 1);
        assert_eq!(analysis.naming_issues.len(), 1);

        let high: Vec<&str> = analysis.high_priority().iter().map(|b| b.name.as_str()).collect();
        let medium: Vec<&str> = analysis.medium_priority().iter().map(|b| b.name.as_str()).collect();
        let low: Vec<&str> = analysis.low_priority().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(high, vec!["feature/old-merged"]);
        assert_eq!(medium, vec!["feature/new-merged"]);
        assert_eq!(low, vec!["spike"]);

        let text = render(&analysis, None).render();
        assert!(text.contains("git branch -D feature/old-merged"));
        assert!(text.contains("git branch -d feature/new-merged"));
    }

    #[test]
    fn test_no_branches_renders() {
        let data = BranchData {
            main_branch: "main".into(),
            total: 1,
            branches: Vec::new(),
        };
        let text = render(&analyze(&data, date("2026-10-19"), 90), None).render();
        assert!(text.contains("Nothing to clean up."));
    }

    #[tokio::test]
    async fn test_main_branch_fallbacks() {
        let runner = ScriptedRunner::new().on("git rev-parse --verify master", "abc\n");
        assert_eq!(main_branch(&runner).await.unwrap(), "master");

        let runner = ScriptedRunner::new().on(
            "git symbolic-ref refs/remotes/origin/HEAD",
            "refs/remotes/origin/trunk\n",
        );
        assert_eq!(main_branch(&runner).await.unwrap(), "trunk");

        let runner = ScriptedRunner::new();
        assert_eq!(main_branch(&runner).await.unwrap(), "main");
    }

    #[tokio::test]
    async fn test_fetch() {
        let runner = ScriptedRunner::git_repo()
            .on("git branch -a", "* main\n  feature/a\n  remotes/origin/hotfix/b\n")
            .on("git rev-parse --verify main", "abc\n")
            .on("git rev-parse --abbrev-ref HEAD", "main\n")
            .on("git branch --merged main", "* main\n  feature/a\n")
            .on("git log -1 --format=%ci feature/a", "2026-10-01 10:00:00 +0000\n")
            .on("git rev-list --count feature/a", "4\n")
            .on("git log -1 --format=%ci origin/hotfix/b", "2025-01-01 10:00:00 +0000\n")
            .on("git rev-list --count origin/hotfix/b", "9\n");

        let data = fetch(&runner).await.unwrap();
        assert_eq!(data.main_branch, "main");
        assert_eq!(data.total, 3);
        assert_eq!(data.branches.len(), 2);

        let a = &data.branches[0];
        assert_eq!(a.name, "feature/a");
        assert!(a.merged);
        assert_eq!(a.commits, 4);

        let b = &data.branches[1];
        assert_eq!(b.name, "hotfix/b");
        assert!(!b.merged);
        assert_eq!(b.commits, 9);
        assert_eq!(b.last_commit, Some(date("2025-01-01")));
    }
}
