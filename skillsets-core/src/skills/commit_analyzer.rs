use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::git;
use crate::models::{CommitRecord, ReportSection};
use crate::report::{bar, pad, percent, Report};
use crate::runner::CommandRunner;

use super::{ranked, WEEKDAYS};

pub const REPORT_FILE: &str = "commit_analysis_report.txt";

const CONVENTIONAL_TYPES: &[&str] = &[
    "feat", "fix", "docs", "style", "refactor", "test", "chore", "perf", "ci", "build",
];

static TYPE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+)(\(.+\))?\s*:").unwrap());

pub async fn fetch(runner: &dyn CommandRunner, limit: Option<usize>) -> Result<Vec<CommitRecord>> {
    git::ensure_repo(runner).await?;

    let limit = limit.map(|n| n.to_string());
    let mut extra = Vec::new();
    if let Some(n) = &limit {
        extra.push("-n");
        extra.push(n.as_str());
    }
    git::log(runner, &extra).await
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContributorStat {
    pub author: String,
    pub commits: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CommitAnalysis {
    pub total: usize,
    pub contributors: Vec<ContributorStat>,
    pub hourly: [usize; 24],
    pub daily: [usize; 7],
    pub monthly: BTreeMap<String, usize>,
    pub first: Option<DateTime<FixedOffset>>,
    pub last: Option<DateTime<FixedOffset>>,
    pub avg_message_length: f64,
    pub commits_per_day: f64,
    pub conventional_count: usize,
    pub type_distribution: Vec<(String, usize)>,
}

impl CommitAnalysis {
    pub fn days_span(&self) -> i64 {
        match (self.first, self.last) {
            (Some(first), Some(last)) => (last - first).num_days() + 1,
            _ => 0,
        }
    }

    pub fn compliance_rate(&self) -> f64 {
        percent(self.conventional_count, self.total)
    }

    pub fn workdays(&self) -> usize {
        self.daily[..5].iter().sum()
    }

    pub fn weekends(&self) -> usize {
        self.daily[5..].iter().sum()
    }

    pub fn peak_hour(&self) -> Option<(usize, usize)> {
        peak(&self.hourly)
    }

    pub fn peak_day(&self) -> Option<(&'static str, usize)> {
        peak(&self.daily).map(|(i, n)| (WEEKDAYS[i], n))
    }

    pub fn compliance_grade(&self) -> &'static str {
        let rate = self.compliance_rate();
        if rate >= 80.0 {
            "✅ Excellent - messages follow the Conventional Commits format"
        } else if rate >= 50.0 {
            "⚠️  Fair - some commits follow the convention, room to improve"
        } else {
            "❌ Needs work - adopt the Conventional Commits format"
        }
    }

    pub fn length_grade(&self) -> &'static str {
        if self.avg_message_length >= 50.0 {
            "✅ Good - messages are descriptive"
        } else if self.avg_message_length >= 20.0 {
            "⚠️  Fair - messages could say more about the change"
        } else {
            "❌ Short - messages are too terse"
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        let mut out = Vec::new();

        if self.compliance_rate() < 80.0 {
            out.push("• Adopt Conventional Commits".to_string());
            out.push(
                "• Prefix messages with a type: feat, fix, docs, style, refactor, test, chore"
                    .to_string(),
            );
            out.push("• Example: feat: add user login".to_string());
        }
        if self.avg_message_length < 30.0 {
            out.push("• Write more detailed messages describing what changed".to_string());
        }
        if self.workdays() > self.weekends() * 3 {
            out.push("• Keep an eye on work-life balance and avoid long overtime".to_string());
        }
        if self.hourly[22] > 0 || self.hourly[23] > 0 {
            out.push("• Cut down on late-night commits".to_string());
        }

        out
    }
}

/// Highest count and its index; the earliest index wins ties.
fn peak(counts: &[usize]) -> Option<(usize, usize)> {
    counts
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((i, n)),
        })
}

pub fn analyze(commits: &[CommitRecord]) -> CommitAnalysis {
    let mut analysis = CommitAnalysis {
        total: commits.len(),
        ..Default::default()
    };
    if commits.is_empty() {
        return analysis;
    }

    let mut authors: HashMap<String, usize> = HashMap::new();
    let mut types: HashMap<String, usize> = HashMap::new();
    let mut message_chars = 0usize;

    for commit in commits {
        *authors.entry(commit.author.clone()).or_default() += 1;

        let ts = commit.timestamp;
        analysis.hourly[ts.hour() as usize] += 1;
        analysis.daily[ts.weekday().num_days_from_monday() as usize] += 1;
        *analysis
            .monthly
            .entry(ts.format("%Y-%m").to_string())
            .or_default() += 1;

        analysis.first = Some(analysis.first.map_or(ts, |f| f.min(ts)));
        analysis.last = Some(analysis.last.map_or(ts, |l| l.max(ts)));

        message_chars += commit.message.chars().count();

        if let Some(caps) = TYPE_PREFIX_RE.captures(commit.message.trim()) {
            let kind = caps[1].to_lowercase();
            if CONVENTIONAL_TYPES.contains(&kind.as_str()) {
                analysis.conventional_count += 1;
                *types.entry(kind).or_default() += 1;
            }
        }
    }

    analysis.contributors = ranked(&authors)
        .into_iter()
        .map(|(author, count)| ContributorStat {
            author,
            commits: count,
            percentage: percent(count, commits.len()),
        })
        .collect();
    analysis.type_distribution = ranked(&types);
    analysis.avg_message_length = message_chars as f64 / commits.len() as f64;

    if commits.len() >= 2 {
        let span = analysis.days_span();
        if span > 0 {
            analysis.commits_per_day = commits.len() as f64 / span as f64;
        }
    }

    analysis
}

pub fn render(analysis: &CommitAnalysis, generated_at: Option<NaiveDateTime>) -> Report {
    let mut report = Report::new("Git Commit History Analysis").with_timestamp(generated_at);

    if analysis.total == 0 {
        let mut section = ReportSection::new("📊 Summary");
        section.line("No commits found in this repository.");
        report.push(section);
        return report;
    }

    let mut basics = ReportSection::new("📊 Summary");
    basics.line(format!("Total commits: {}", analysis.total));
    basics.line(format!("Contributors: {}", analysis.contributors.len()));
    if let (Some(first), Some(last)) = (analysis.first, analysis.last) {
        basics.line(format!(
            "Date range: {} to {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        ));
        basics.line(format!("Span: {} days", analysis.days_span()));
    }
    basics.line(format!(
        "Commit frequency: {:.2} commits/day",
        analysis.commits_per_day
    ));
    basics.line(format!(
        "Average message length: {:.1} chars",
        analysis.avg_message_length
    ));
    report.push(basics);

    let mut contributors = ReportSection::new("👥 Contributors");
    contributors.line(format!(
        "{} {} {} Share",
        pad("Rank", 6),
        pad("Author", 30),
        pad("Commits", 10)
    ));
    for (i, c) in analysis.contributors.iter().enumerate() {
        contributors.line(format!(
            "{} {} {} {:>5.1}% {}",
            pad(&(i + 1).to_string(), 6),
            pad(&c.author, 30),
            pad(&c.commits.to_string(), 10),
            c.percentage,
            "█".repeat((c.percentage / 2.0) as usize)
        ));
    }
    report.push(contributors);

    let mut hourly = ReportSection::new("⏰ Commits by Hour");
    let hourly_max = analysis.hourly.iter().copied().max().unwrap_or(0) as f64;
    for (hour, count) in analysis.hourly.iter().enumerate() {
        let marker = if hour == 12 || hour == 18 { " 👈" } else { "" };
        hourly.line(format!(
            "{hour:02}:00 {} {count:>4}{marker}",
            bar(*count as f64, hourly_max, 40)
        ));
    }
    hourly.blank();
    hourly.line("Note: 👈 marks 12:00 and 18:00, the usual peak hours");
    report.push(hourly);

    let mut daily = ReportSection::new("📅 Commits by Weekday");
    let daily_max = analysis.daily.iter().copied().max().unwrap_or(0) as f64;
    for (i, count) in analysis.daily.iter().enumerate() {
        daily.line(format!(
            "{} {} {count:>4}",
            pad(&WEEKDAYS[i][..3], 3),
            bar(*count as f64, daily_max, 40)
        ));
    }
    report.push(daily);

    if !analysis.monthly.is_empty() {
        let mut monthly = ReportSection::new("📈 Monthly Trend");
        let skip = analysis.monthly.len().saturating_sub(12);
        let recent: Vec<(&String, &usize)> = analysis.monthly.iter().skip(skip).collect();
        let monthly_max = recent.iter().map(|(_, n)| **n).max().unwrap_or(0) as f64;
        for (month, count) in recent {
            monthly.line(format!(
                "{month} {} {count}",
                bar(*count as f64, monthly_max, 30)
            ));
        }
        report.push(monthly);
    }

    let mut quality = ReportSection::new("✍️  Commit Message Quality");
    quality.line(format!(
        "Conventional Commits compliance: {:.1}%",
        analysis.compliance_rate()
    ));
    quality.line(format!(
        "Conventional commits: {} / {}",
        analysis.conventional_count, analysis.total
    ));
    if !analysis.type_distribution.is_empty() {
        quality.blank();
        quality.line("Type distribution:");
        for (kind, count) in &analysis.type_distribution {
            let share = percent(*count, analysis.conventional_count);
            quality.line(format!(
                "  {} {} {count:>4} ({share:>5.1}%)",
                pad(kind, 12),
                "█".repeat((share / 2.0) as usize)
            ));
        }
    }
    quality.blank();
    quality.line("Assessment:");
    quality.line(format!("  {}", analysis.compliance_grade()));
    quality.line(format!("  {}", analysis.length_grade()));
    report.push(quality);

    let mut activity = ReportSection::new("🎯 Activity");
    if let Some((hour, count)) = analysis.peak_hour() {
        activity.line(format!("Busiest hour: {hour:02}:00 ({count} commits)"));
    }
    if let Some((day, count)) = analysis.peak_day() {
        activity.line(format!("Busiest day: {day} ({count} commits)"));
    }
    let workdays = analysis.workdays();
    let weekends = analysis.weekends();
    let total = workdays + weekends;
    if total > 0 {
        activity.blank();
        activity.line(format!(
            "Workday commits: {workdays} ({:.1}%)",
            percent(workdays, total)
        ));
        activity.line(format!(
            "Weekend commits: {weekends} ({:.1}%)",
            percent(weekends, total)
        ));
    }
    report.push(activity);

    let mut advice = ReportSection::new("💡 Suggestions");
    let suggestions = analysis.suggestions();
    if suggestions.is_empty() {
        advice.line("✅ Commit habits look healthy, keep it up!");
    } else {
        for s in suggestions {
            advice.line(s);
        }
    }
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
            // 2026-03-07 is a Saturday.
            commit("a3", "alice", "2026-03-07T23:15:00+00:00", "feat(ui): add dark mode toggle to settings"),
            commit("a2", "bob", "2026-03-03T12:00:00+00:00", "fix: crash"),
            commit("a1", "alice", "2026-03-02T09:30:00+00:00", "initial import"),
        ]
    }

    #[test]
    fn test_contributors_ranked() {
        let analysis = analyze(&sample());
        assert_eq!(analysis.contributors[0].author, "alice");
        assert_eq!(analysis.contributors[0].commits, 2);
        assert!((analysis.contributors[0].percentage - 66.666).abs() < 0.01);
        assert_eq!(analysis.contributors[1].author, "bob");
    }

    #[test]
    fn test_heatmaps_and_span() {
        let analysis = analyze(&sample());
        assert_eq!(analysis.hourly[23], 1);
        assert_eq!(analysis.hourly[12], 1);
        assert_eq!(analysis.daily[0], 1);
        assert_eq!(analysis.daily[5], 1);
        assert_eq!(analysis.monthly.get("2026-03"), Some(&3));
        assert_eq!(analysis.days_span(), 6);
        assert!((analysis.commits_per_day - 0.5).abs() < 1e-9);
        assert_eq!(analysis.workdays(), 2);
        assert_eq!(analysis.weekends(), 1);
    }

    #[test]
    fn test_conventional_compliance() {
        let analysis = analyze(&sample());
        assert_eq!(analysis.conventional_count, 2);
        assert!((analysis.compliance_rate() - 66.666).abs() < 0.01);
        assert!(analysis.compliance_grade().starts_with("⚠️"));
        assert_eq!(analysis.type_distribution.len(), 2);
    }

    #[test]
    fn test_suggestions() {
        let analysis = analyze(&sample());
        let suggestions = analysis.suggestions();
        assert!(suggestions.iter().any(|s| s.contains("Conventional Commits")));
        assert!(suggestions.iter().any(|s| s.contains("late-night")));
        assert!(!suggestions.iter().any(|s| s.contains("work-life")));
    }

    #[test]
    fn test_single_commit_has_no_rate() {
        let analysis = analyze(&sample()[..1]);
        assert_eq!(analysis.commits_per_day, 0.0);
        assert_eq!(analysis.days_span(), 1);
    }

    #[test]
    fn test_empty_history_report() {
        let analysis = analyze(&[]);
        let text = render(&analysis, None).render();
        assert!(text.contains("No commits found"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let analysis = analyze(&sample());
        let a = render(&analysis, None).render();
        let b = render(&analyze(&sample()), None).render();
        similar_asserts::assert_eq!(a, b);
        assert!(a.contains("23:00"));
        assert!(a.contains("Busiest day: Monday"));
    }

    #[tokio::test]
    async fn test_fetch_with_limit() {
        let log = format!(
            "{}|alice|2026-03-02T09:30:00+00:00|feat: x\n",
            hash("a1")
        );
        let runner = ScriptedRunner::git_repo().on("git log", &log);
        let commits = fetch(&runner, Some(5)).await.unwrap();
        assert_eq!(commits.len(), 1);
        assert!(runner.called(&format!("git log {} -n 5", git::LOG_FORMAT)));
    }

    #[tokio::test]
    async fn test_fetch_outside_repo() {
        let runner = ScriptedRunner::new().fail("git rev-parse", "fatal: not a git repository");
        assert!(fetch(&runner, None).await.is_err());
    }
}
