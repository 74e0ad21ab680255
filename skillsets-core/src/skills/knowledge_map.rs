//! Knowledge map: who knows which files, where the bus factor is dangerously
//! low, and which files tend to be changed by the same people.

use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::git;
use crate::models::{CommitRecord, ReportSection};
use crate::paths;
use crate::report::{pad, percent, truncate_start, Report};
use crate::runner::CommandRunner;
use crate::skills::ranked;

pub const REPORT_FILE: &str = "knowledge_map_report.txt";
pub const DOT_FILE: &str = "knowledge_graph.dot";

const WIDTH: usize = 120;

/// Whole history with file lists, merges split per parent.
pub async fn fetch(runner: &dyn CommandRunner) -> Result<Vec<CommitRecord>> {
    git::ensure_repo(runner).await?;
    let mut commits = git::log(runner, &["--name-only", "-m"]).await?;
    for commit in &mut commits {
        commit
            .files
            .retain(|f| !paths::is_excluded_non_code(&f.path));
    }
    Ok(commits)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Critical,
        RiskLevel::High,
        RiskLevel::Medium,
        RiskLevel::Low,
    ];

    /// Risk from the number of people who have touched a file.
    pub fn from_contributors(count: usize) -> Self {
        match count {
            0 | 1 => RiskLevel::Critical,
            2 => RiskLevel::High,
            3..=5 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::Critical => "Critical",
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }

    pub fn emoji(&self) -> &str {
        match self {
            RiskLevel::Critical => "🔴",
            RiskLevel::High => "🟠",
            RiskLevel::Medium => "🟡",
            RiskLevel::Low => "🟢",
        }
    }

    fn people(&self) -> &str {
        match self {
            RiskLevel::Critical => "1 person",
            RiskLevel::High => "2 people",
            RiskLevel::Medium => "3-5 people",
            RiskLevel::Low => "6+ people",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileOwnership {
    pub path: String,
    pub primary_owner: String,
    /// Most active first.
    pub contributors: Vec<String>,
    pub total_commits: usize,
    /// Share of the primary owner's commits, 0.0 to 1.0.
    pub concentration: f64,
    pub risk: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub first: String,
    pub second: String,
    /// Number of authors who changed both files.
    pub shared_authors: usize,
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeMap {
    /// author → file → commits
    pub by_author: HashMap<String, HashMap<String, usize>>,
    /// Sorted by total commits, descending.
    pub ownership: Vec<FileOwnership>,
    pub relationships: Vec<Relationship>,
}

impl KnowledgeMap {
    /// Authors ranked by the number of file changes they made.
    pub fn author_ranking(&self) -> Vec<(String, usize)> {
        let totals: HashMap<String, usize> = self
            .by_author
            .iter()
            .map(|(a, files)| (a.clone(), files.values().sum()))
            .collect();
        ranked(&totals)
    }

    pub fn risk_counts(&self) -> BTreeMap<RiskLevel, usize> {
        let mut counts: BTreeMap<RiskLevel, usize> =
            RiskLevel::ALL.iter().map(|r| (*r, 0)).collect();
        for o in &self.ownership {
            *counts.entry(o.risk).or_default() += 1;
        }
        counts
    }

    /// Areas an author changed most, keyed by the first two path segments.
    pub fn expertise(&self, author: &str) -> Vec<(String, usize)> {
        let mut areas: HashMap<String, usize> = HashMap::new();
        if let Some(files) = self.by_author.get(author) {
            for (path, count) in files {
                let area = path.split('/').take(2).collect::<Vec<_>>().join("/");
                *areas.entry(area).or_default() += count;
            }
        }
        ranked(&areas)
    }

    pub fn high_risk(&self) -> Vec<&FileOwnership> {
        let mut files: Vec<&FileOwnership> = self
            .ownership
            .iter()
            .filter(|o| matches!(o.risk, RiskLevel::Critical | RiskLevel::High))
            .collect();
        files.sort_by_key(|o| o.contributors.len());
        files
    }
}

pub fn analyze(commits: &[CommitRecord]) -> KnowledgeMap {
    let mut by_author: HashMap<String, HashMap<String, usize>> = HashMap::new();
    let mut by_file: HashMap<String, HashMap<String, usize>> = HashMap::new();

    for commit in commits {
        for file in &commit.files {
            *by_author
                .entry(commit.author.clone())
                .or_default()
                .entry(file.path.clone())
                .or_default() += 1;
            *by_file
                .entry(file.path.clone())
                .or_default()
                .entry(commit.author.clone())
                .or_default() += 1;
        }
    }

    let mut ownership: Vec<FileOwnership> = by_file
        .iter()
        .map(|(path, authors)| {
            let authors = ranked(authors);
            let total: usize = authors.iter().map(|(_, n)| n).sum();
            let (primary, top) = authors
                .first()
                .map(|(a, n)| (a.clone(), *n))
                .unwrap_or_else(|| ("Unknown".to_string(), 0));
            FileOwnership {
                path: path.clone(),
                primary_owner: primary,
                risk: RiskLevel::from_contributors(authors.len()),
                contributors: authors.into_iter().map(|(a, _)| a).collect(),
                total_commits: total,
                concentration: if total > 0 {
                    top as f64 / total as f64
                } else {
                    0.0
                },
            }
        })
        .collect();
    ownership.sort_by(|a, b| {
        b.total_commits
            .cmp(&a.total_commits)
            .then_with(|| a.path.cmp(&b.path))
    });

    let mut pairs: HashMap<(String, String), usize> = HashMap::new();
    for files in by_author.values() {
        let mut list: Vec<&String> = files.keys().collect();
        list.sort();
        for (i, first) in list.iter().enumerate() {
            for second in &list[i + 1..] {
                *pairs
                    .entry(((*first).clone(), (*second).clone()))
                    .or_default() += 1;
            }
        }
    }
    let relationships = ranked(&pairs)
        .into_iter()
        .filter(|(_, n)| *n >= 2)
        .map(|((first, second), shared_authors)| Relationship {
            first,
            second,
            shared_authors,
        })
        .collect();

    KnowledgeMap {
        by_author,
        ownership,
        relationships,
    }
}

fn dot_id(s: &str) -> String {
    s.replace(['/', '.', '-', '"', '\\'], "_")
}

/// Escapes a value for a double-quoted DOT string.
fn dot_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Graphviz rendering: one cluster per top-level directory, coloured by bus
/// factor, with edges between strongly related files.
pub fn to_dot(map: &KnowledgeMap) -> String {
    let mut out = vec![
        "digraph KnowledgeGraph {".to_string(),
        "  rankdir=LR;".to_string(),
        "  node [shape=box, style=rounded];".to_string(),
        String::new(),
    ];

    let mut modules: BTreeMap<&str, Vec<&FileOwnership>> = BTreeMap::new();
    for o in &map.ownership {
        let module = match o.path.split_once('/') {
            Some((first, _)) => first,
            None => "root",
        };
        modules.entry(module).or_default().push(o);
    }

    for (module, mut files) in modules {
        if files.len() < 2 {
            continue;
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        out.push(format!("  subgraph \"cluster_{}\" {{", dot_id(module)));
        out.push(format!("    label=\"{}\";", dot_label(module)));
        out.push("    style=filled;".to_string());
        out.push("    color=lightgrey;".to_string());
        for o in files.iter().take(10) {
            let color = match o.contributors.len() {
                0..=2 => "red",
                3..=5 => "yellow",
                _ => "green",
            };
            out.push(format!(
                "    \"{}\" [label=\"{}\", fillcolor={color}, style=\"rounded,filled\"];",
                dot_id(&o.path),
                dot_label(&o.path)
            ));
        }
        out.push("  }".to_string());
        out.push(String::new());
    }

    for r in map.relationships.iter().take(50) {
        out.push(format!(
            "  \"{}\" -> \"{}\" [label=\"{}\", penwidth={}];",
            dot_id(&r.first),
            dot_id(&r.second),
            r.shared_authors,
            r.shared_authors.min(3)
        ));
    }

    out.push("}".to_string());
    out.push(String::new());
    out.join("\n")
}

pub fn render(map: &KnowledgeMap, generated_at: Option<NaiveDateTime>) -> Report {
    let mut report = Report::new("Knowledge Map Analysis")
        .with_width(WIDTH)
        .with_timestamp(generated_at);
    report
        .meta("Contributors", map.by_author.len())
        .meta("Files analyzed", map.ownership.len())
        .meta("File relationships", map.relationships.len());

    let authors = map.author_ranking();
    let total_changes: usize = authors.iter().map(|(_, n)| n).sum();
    let mut contributors = ReportSection::new("👥 Contributors (by file changes)");
    for (i, (author, count)) in authors.iter().take(20).enumerate() {
        contributors.line(format!(
            "  {:>2}. {} changes: {} ({:.1}%)",
            i + 1,
            pad(author, 30),
            pad(&count.to_string(), 4),
            percent(*count, total_changes)
        ));
    }
    report.push(contributors);

    let counts = map.risk_counts();
    let mut risk = ReportSection::new("⚠️  Knowledge Risk (Bus Factor)");
    for level in RiskLevel::ALL {
        risk.line(format!(
            "{} {} risk ({}): {} files",
            level.emoji(),
            level.as_str(),
            level.people(),
            counts.get(&level).copied().unwrap_or(0)
        ));
    }
    let high_risk = map.high_risk();
    if !high_risk.is_empty() {
        risk.blank();
        risk.line("High-risk files:");
        risk.blank();
        for o in high_risk.iter().take(30) {
            risk.line(format!("  {} {}", o.risk.emoji(), o.path));
            risk.line(format!("     Primary owner: {}", o.primary_owner));
            risk.line(format!(
                "     Contributors: {} | Commits: {}",
                o.contributors.len(),
                o.total_commits
            ));
            risk.blank();
        }
    }
    report.push(risk);

    let mut owners = ReportSection::new("📁 Code Ownership (top 30 files)");
    owners.line(format!(
        "{} {} {} {} Risk",
        pad("Path", 50),
        pad("Primary owner", 20),
        pad("People", 8),
        pad("Share", 10)
    ));
    for o in map.ownership.iter().take(30) {
        owners.line(format!(
            "{} {} {} {} {} {}",
            pad(&truncate_start(&o.path, 48), 50),
            pad(&o.primary_owner, 20),
            pad(&o.contributors.len().to_string(), 8),
            pad(&format!("{:.0}%", o.concentration * 100.0), 10),
            o.risk.emoji(),
            o.risk.as_str()
        ));
    }
    report.push(owners);

    let mut expertise = ReportSection::new("🎯 Areas of Expertise");
    for (author, _) in authors.iter().take(10) {
        let areas = map.expertise(author);
        if areas.is_empty() {
            continue;
        }
        expertise.line(format!("  {author}:"));
        for (area, count) in areas.iter().take(5) {
            expertise.line(format!("    - {area} ({count} changes)"));
        }
        expertise.blank();
    }
    report.push(expertise);

    if !map.relationships.is_empty() {
        let mut related = ReportSection::new("🔗 Related Files");
        related.line("These files are changed by the same people and may depend on each other:");
        related.blank();
        for r in map.relationships.iter().take(20) {
            related.line(format!("  {:>3} authors: {}", r.shared_authors, r.first));
            related.line(format!("               {}", r.second));
            related.blank();
        }
        report.push(related);
    }

    let mut advice = ReportSection::new("💡 Recommendations");
    let critical = counts.get(&RiskLevel::Critical).copied().unwrap_or(0);
    let high = counts.get(&RiskLevel::High).copied().unwrap_or(0);
    if critical > 0 {
        advice.line(format!("🚨 {critical} critical-risk files have a single owner:"));
        advice.line("  - Name a backup owner for each of them");
        advice.line("  - Use code review to spread familiarity with the code");
        advice.line("  - Consider simplifying or rewriting them");
        advice.blank();
    }
    if high > 0 {
        advice.line(format!("⚠️  {high} high-risk files have only two people who know them:"));
        advice.line("  - Widen the group familiar with these files");
        advice.line("  - Hold knowledge-sharing sessions");
        advice.blank();
    }
    advice.line("General:");
    advice.line("  - Run this analysis regularly to watch the knowledge spread");
    advice.line("  - Pair program on high-risk files");
    advice.line("  - Rotate code reviewers");
    advice.line("  - Keep documentation current to avoid knowledge silos");
    report.push(advice);

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeStatus;
    use crate::runner::fake::ScriptedRunner;
    use crate::skills::fixtures::{commit, hash};

    fn change(tag: &str, author: &str, files: &[&str]) -> CommitRecord {
        files.iter().fold(
            commit(&hash(tag), author, "2026-02-01T10:00:00+00:00", "change"),
            |c, f| c.with_file(*f, ChangeStatus::Other),
        )
    }

    fn history() -> Vec<CommitRecord> {
        vec![
            change("1", "alice", &["src/core.rs", "src/api.rs"]),
            change("2", "alice", &["src/core.rs"]),
            change("3", "bob", &["src/core.rs", "src/api.rs"]),
            change("4", "carol", &["src/util.rs"]),
        ]
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskLevel::from_contributors(1), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_contributors(2), RiskLevel::High);
        assert_eq!(RiskLevel::from_contributors(5), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_contributors(6), RiskLevel::Low);
    }

    #[test]
    fn test_ownership() {
        let map = analyze(&history());
        let core = &map.ownership[0];
        assert_eq!(core.path, "src/core.rs");
        assert_eq!(core.primary_owner, "alice");
        assert_eq!(core.total_commits, 3);
        assert!((core.concentration - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(core.risk, RiskLevel::High);

        let counts = map.risk_counts();
        assert_eq!(counts[&RiskLevel::Critical], 1);
        assert_eq!(counts[&RiskLevel::High], 2);
        assert_eq!(map.high_risk()[0].path, "src/util.rs");
    }

    #[test]
    fn test_relationships_are_unordered_pairs() {
        let map = analyze(&history());
        assert_eq!(
            map.relationships,
            vec![Relationship {
                first: "src/api.rs".into(),
                second: "src/core.rs".into(),
                shared_authors: 2,
            }]
        );
    }

    #[test]
    fn test_author_ranking_and_expertise() {
        let map = analyze(&history());
        assert_eq!(
            map.author_ranking(),
            vec![
                ("alice".to_string(), 3),
                ("bob".to_string(), 2),
                ("carol".to_string(), 1)
            ]
        );
        assert_eq!(map.expertise("alice"), vec![("src/core.rs".to_string(), 2), ("src/api.rs".to_string(), 1)]);
    }

    #[test]
    fn test_dot_output() {
        let dot = to_dot(&analyze(&history()));
        assert!(dot.starts_with("digraph KnowledgeGraph {"));
        assert!(dot.contains("subgraph \"cluster_src\" {"));
        assert!(dot.contains("\"src_core_rs\" [label=\"src/core.rs\", fillcolor=red"));
        assert!(dot.contains("\"src_api_rs\" -> \"src_core_rs\" [label=\"2\", penwidth=2];"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_dot_quotes_unusual_directory_names() {
        let commits = vec![
            change("1", "alice", &["my lib@2/a+b.rs", "my lib@2/c.rs"]),
            change("2", "bob", &["my lib@2/a+b.rs", "my lib@2/c.rs"]),
        ];
        let dot = to_dot(&analyze(&commits));
        assert!(dot.contains("  subgraph \"cluster_my lib@2\" {"));
        assert!(dot.contains("    label=\"my lib@2\";"));
        assert!(dot.contains("\"my lib@2_a+b_rs\" [label=\"my lib@2/a+b.rs\""));
        assert_eq!(dot_label(r#"say "hi"\"#), r#"say \"hi\"\\"#);
    }

    #[test]
    fn test_render() {
        let text = render(&analyze(&history()), None).render();
        assert!(text.contains("Contributors: 3"));
        assert!(text.contains("🔴 Critical risk (1 person): 1 files"));
        assert!(text.contains("Primary owner: carol"));
        assert!(text.contains("2 authors: src/api.rs"));
    }

    #[tokio::test]
    async fn test_fetch_filters_non_code() {
        let log = format!(
            "{}|dev|2026-02-01T10:00:00+00:00|docs\nREADME.md\nsrc/lib.rs\nnode_modules/x/index.js\n",
            hash("9")
        );
        let runner = ScriptedRunner::git_repo().on(&format!("git log {}", git::LOG_FORMAT), &log);
        let commits = fetch(&runner).await.unwrap();
        let files: Vec<&str> = commits[0].files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(files, vec!["src/lib.rs"]);
    }
}
