//! Completed work classified by conventional commit type, with weekly and
//! monthly velocity.

use chrono::{Datelike, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};

use crate::conventional;
use crate::error::Result;
use crate::git;
use crate::models::{CommitRecord, ReportSection};
use crate::report::{bar, pad, pad_left, percent, Report};
use crate::runner::CommandRunner;
use crate::skills::{ranked, WEEKDAYS};

pub const REPORT_FILE: &str = "task_completion_report.txt";

const WIDTH: usize = 140;
const OTHER: &str = "other";
const MONTHLY_TYPES: [&str; 6] = ["feat", "fix", "refactor", "docs", "test", "chore"];

pub async fn fetch(runner: &dyn CommandRunner, days: i64) -> Result<Vec<CommitRecord>> {
    git::ensure_repo(runner).await?;
    let since = git::since_arg(days);
    let commits = git::log(runner, &[since.as_str(), "--no-merges"]).await?;
    tracing::info!(count = commits.len(), days, "Fetched commits for task tracking");
    Ok(commits)
}

/// Known conventional type of the subject, `other` otherwise.
pub fn task_type(message: &str) -> String {
    conventional::known_type(message).unwrap_or_else(|| OTHER.to_string())
}

pub fn type_label(kind: &str) -> String {
    let label = match kind {
        "feat" => "Features",
        "fix" => "Bug fixes",
        "refactor" => "Refactoring",
        "docs" => "Documentation",
        "test" => "Tests",
        "chore" => "Chores",
        "style" => "Code style",
        "perf" => "Performance",
        "ci" => "CI/CD",
        "build" => "Build",
        "revert" => "Reverts",
        _ => {
            let mut chars = kind.chars();
            return match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            };
        }
    };
    label.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    fn label(&self) -> &'static str {
        match self {
            Trend::Up => "📈 Rising",
            Trend::Down => "📉 Falling",
            Trend::Stable => "➡️ Stable",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Velocity {
    pub trend: Trend,
    pub recent_avg: f64,
    pub earlier_avg: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TaskStats {
    pub total: usize,
    pub by_type: HashMap<String, usize>,
    /// Keyed by `%Y-W%W`.
    pub by_week: BTreeMap<String, HashMap<String, usize>>,
    /// Keyed by `%Y-%m`.
    pub by_month: BTreeMap<String, HashMap<String, usize>>,
    /// Monday first.
    pub by_weekday: [usize; 7],
}

impl TaskStats {
    pub fn count(&self, kind: &str) -> usize {
        self.by_type.get(kind).copied().unwrap_or(0)
    }

    /// Fixes per feature; zero without features.
    pub fn bug_feature_ratio(&self) -> f64 {
        let feat = self.count("feat");
        if feat == 0 {
            0.0
        } else {
            self.count("fix") as f64 / feat as f64
        }
    }

    pub fn weekly(&self) -> Vec<(String, usize)> {
        totals(&self.by_week)
    }

    pub fn monthly(&self) -> Vec<(String, usize)> {
        totals(&self.by_month)
    }

    pub fn weekly_average(&self) -> f64 {
        let weeks = self.weekly();
        if weeks.is_empty() {
            return 0.0;
        }
        weeks.iter().map(|(_, n)| *n).sum::<usize>() as f64 / weeks.len() as f64
    }

    /// Last four weeks against the four before; needs at least four weeks of
    /// activity. With fewer than eight weeks the recent average is its own baseline.
    pub fn velocity(&self) -> Option<Velocity> {
        let weeks: Vec<usize> = self.weekly().into_iter().map(|(_, n)| n).collect();
        if weeks.len() < 4 {
            return None;
        }
        let n = weeks.len();
        let recent_avg = weeks[n - 4..].iter().sum::<usize>() as f64 / 4.0;
        let earlier_avg = if n >= 8 {
            weeks[n - 8..n - 4].iter().sum::<usize>() as f64 / 4.0
        } else {
            recent_avg
        };

        let trend = if recent_avg > earlier_avg * 1.1 {
            Trend::Up
        } else if recent_avg < earlier_avg * 0.9 {
            Trend::Down
        } else {
            Trend::Stable
        };
        Some(Velocity {
            trend,
            recent_avg,
            earlier_avg,
        })
    }

    pub fn insights(&self) -> Vec<String> {
        let mut insights = Vec::new();
        let ratio = self.bug_feature_ratio();
        if self.count("feat") > 0 && self.count("fix") > 0 {
            if ratio > 0.5 {
                insights.push(format!(
                    "⚠️  High bug/feature ratio ({ratio:.2}); keep an eye on code quality"
                ));
            } else if ratio < 0.2 {
                insights.push(format!("✅ Healthy bug/feature ratio ({ratio:.2})"));
            }
        }

        let refactor = percent(self.count("refactor"), self.total);
        if refactor > 15.0 {
            insights.push(format!(
                "🔧 Refactoring is {refactor:.1}% of the work; the code is actively maintained"
            ));
        } else if refactor < 5.0 {
            insights.push(format!(
                "💡 Refactoring is only {refactor:.1}%; schedule some to keep technical debt down"
            ));
        }

        let tests = percent(self.count("test"), self.total);
        if tests > 10.0 {
            insights.push(format!("✅ Test commits make up {tests:.1}%"));
        } else {
            insights.push(format!(
                "💡 Test commits make up only {tests:.1}%; consider investing more in tests"
            ));
        }

        let docs = self.count("docs");
        if docs > 0 {
            insights.push(format!("📚 {docs} documentation commits"));
        }

        if let Some(velocity) = self.velocity() {
            if velocity.recent_avg < 5.0 {
                insights.push(format!(
                    "📊 Only {:.1} tasks per week recently; check team capacity",
                    velocity.recent_avg
                ));
            } else if velocity.recent_avg > 20.0 {
                insights.push(format!(
                    "📊 {:.1} tasks per week recently; a very productive stretch",
                    velocity.recent_avg
                ));
            }
        }
        insights
    }
}

fn totals(buckets: &BTreeMap<String, HashMap<String, usize>>) -> Vec<(String, usize)> {
    buckets
        .iter()
        .map(|(key, types)| (key.clone(), types.values().sum()))
        .collect()
}

pub fn analyze(commits: &[CommitRecord]) -> TaskStats {
    let mut stats = TaskStats::default();
    for commit in commits {
        let kind = task_type(&commit.message);
        let at = commit.timestamp;

        *stats
            .by_week
            .entry(at.format("%Y-W%W").to_string())
            .or_default()
            .entry(kind.clone())
            .or_default() += 1;
        *stats
            .by_month
            .entry(at.format("%Y-%m").to_string())
            .or_default()
            .entry(kind.clone())
            .or_default() += 1;
        stats.by_weekday[at.weekday().num_days_from_monday() as usize] += 1;
        *stats.by_type.entry(kind).or_default() += 1;
        stats.total += 1;
    }
    stats
}

pub fn render(stats: &TaskStats, days: i64, generated_at: Option<NaiveDateTime>) -> Report {
    let mut report = Report::new("Task Completion Analysis")
        .with_width(WIDTH)
        .with_timestamp(generated_at);
    report.meta("Window", format!("last {days} days"));

    if stats.total == 0 {
        let mut empty = ReportSection::new("⚠️  No commits in window");
        empty.line("Possible reasons:");
        empty.line("  - the repository is new and has no commits yet");
        empty.line("  - there was no activity in the selected window");
        empty.line("  - the directory is not a git repository");
        report.push(empty);
        return report;
    }
    report.meta("Total tasks", stats.total);

    let mut types = ReportSection::new("📊 Task Types");
    for (kind, count) in ranked(&stats.by_type) {
        let share = percent(count, stats.total);
        types.line(format!(
            "  {} {} ({share:>5.1}%) {}",
            pad(&type_label(&kind), 15),
            pad_left(&count.to_string(), 4),
            bar(share, 100.0, 50)
        ));
    }
    types.blank();
    types.line("Key metrics:");
    for (icon, kind) in [("🎯", "feat"), ("🐛", "fix"), ("🔧", "refactor")] {
        let count = stats.count(kind);
        types.line(format!(
            "  {icon} {} {count} ({:.1}%)",
            pad(&format!("{} ({kind}):", type_label(kind)), 26),
            percent(count, stats.total)
        ));
    }
    types.line(format!(
        "  📈 {} {:.2} (fixes per feature)",
        pad("Bug/feature ratio:", 26),
        stats.bug_feature_ratio()
    ));
    report.push(types);

    let mut velocity = ReportSection::new("🚀 Velocity");
    let weekly = stats.weekly();
    velocity.line(format!(
        "Average per week: {:.1} tasks",
        stats.weekly_average()
    ));
    velocity.blank();
    velocity.line("Last 8 weeks:");
    for (week, count) in weekly.iter().skip(weekly.len().saturating_sub(8)) {
        velocity.line(format!("  {week}:  {} tasks", pad_left(&count.to_string(), 3)));
    }
    if let Some(v) = stats.velocity() {
        velocity.blank();
        velocity.line(format!(
            "Trend: {} (last 4 weeks avg {:.1} vs previous 4 weeks avg {:.1})",
            v.trend.label(),
            v.recent_avg,
            v.earlier_avg
        ));
    }
    velocity.blank();
    velocity.line("Monthly:");
    for (month, count) in stats.monthly() {
        velocity.line(format!("  {month}:  {} tasks", pad_left(&count.to_string(), 3)));
    }
    report.push(velocity);

    let mut weekdays = ReportSection::new("📅 Active Days");
    let max = stats.by_weekday.iter().copied().max().unwrap_or(0);
    for (day, count) in WEEKDAYS.iter().zip(stats.by_weekday) {
        if count > 0 {
            weekdays.line(format!(
                "  {} {} {}",
                pad(day, 10),
                pad_left(&count.to_string(), 3),
                bar(count as f64, max as f64, 30)
            ));
        }
    }
    report.push(weekdays);

    let mut monthly = ReportSection::new("📈 Task Types by Month");
    let months: Vec<_> = stats.by_month.iter().collect();
    for (month, types) in months.iter().skip(months.len().saturating_sub(6)) {
        let total: usize = types.values().sum();
        monthly.line(format!("{month} ({total} tasks):"));
        for kind in MONTHLY_TYPES {
            let count = types.get(kind).copied().unwrap_or(0);
            if count > 0 {
                monthly.line(format!(
                    "  {} {}",
                    pad(&type_label(kind), 15),
                    pad_left(&count.to_string(), 3)
                ));
            }
        }
        monthly.blank();
    }
    report.push(monthly);

    let mut insights = ReportSection::new("💡 Insights");
    for insight in stats.insights() {
        insights.line(insight);
    }
    insights.blank();
    insights.line("General advice:");
    insights.line("  - keep a steady commit rhythm and avoid crunch");
    insights.line("  - balance feature work against bug fixing");
    insights.line("  - refactor regularly before debt piles up");
    insights.line("  - keep tests and documentation current");
    insights.line("  - watch the velocity trend and adjust plans early");
    report.push(insights);

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::ScriptedRunner;
    use crate::skills::fixtures::{commit, hash};

    fn sample() -> Vec<CommitRecord> {
        vec![
            commit(&hash("1"), "ana", "2026-10-12T10:00:00+00:00", "feat: add export"),
            commit(&hash("2"), "ana", "2026-10-13T10:00:00+00:00", "fix(ui): button"),
            commit(&hash("3"), "bo", "2026-10-14T10:00:00+00:00", "Fix: typo"),
            commit(&hash("4"), "bo", "2026-09-30T10:00:00+00:00", "refactor: split"),
            commit(&hash("5"), "bo", "2026-09-29T10:00:00+00:00", "update readme"),
            commit(&hash("6"), "bo", "2026-09-28T10:00:00+00:00", "feat!: drop v1"),
        ]
    }

    #[test]
    fn test_task_type() {
        assert_eq!(task_type("feat(api): add"), "feat");
        assert_eq!(task_type("Revert: oops"), "revert");
        assert_eq!(task_type("wip: stuff"), "other");
        assert_eq!(task_type("plain message"), "other");
        assert_eq!(type_label("other"), "Other");
        assert_eq!(type_label("fix"), "Bug fixes");
    }

    #[test]
    fn test_analyze_buckets() {
        let stats = analyze(&sample());
        assert_eq!(stats.total, 6);
        assert_eq!(stats.count("feat"), 2);
        assert_eq!(stats.count("fix"), 2);
        assert_eq!(stats.count("other"), 1);
        assert_eq!(stats.bug_feature_ratio(), 1.0);

        assert_eq!(
            stats.monthly(),
            vec![("2026-09".to_string(), 3), ("2026-10".to_string(), 3)]
        );
        // 2026-09-28 is a Monday.
        assert_eq!(stats.by_weekday[0], 2);
        assert_eq!(stats.by_weekday[1], 2);
        assert_eq!(stats.weekly().len(), 2);
        assert!(stats.velocity().is_none());
    }

    #[test]
    fn test_velocity_trend() {
        let mut stats = TaskStats::default();
        for (i, n) in [2, 2, 2, 2, 5, 5, 5, 5].iter().enumerate() {
            stats
                .by_week
                .insert(format!("2026-W{:02}", i + 30), HashMap::from([("feat".to_string(), *n)]));
        }
        let v = stats.velocity().unwrap();
        assert_eq!(v.trend, Trend::Up);
        assert_eq!(v.recent_avg, 5.0);
        assert_eq!(v.earlier_avg, 2.0);

        stats.by_week.clear();
        for i in 0..5 {
            stats
                .by_week
                .insert(format!("2026-W{:02}", i + 30), HashMap::from([("fix".to_string(), 3)]));
        }
        assert_eq!(stats.velocity().unwrap().trend, Trend::Stable);
    }

    #[test]
    fn test_insights() {
        let insights = analyze(&sample()).insights();
        assert!(insights[0].contains("High bug/feature ratio (1.00)"));
        assert!(insights.iter().any(|i| i.contains("Refactoring is 16.7%")));
        assert!(insights.iter().any(|i| i.contains("only 0.0%")));
    }

    #[test]
    fn test_render_empty_window() {
        let text = render(&TaskStats::default(), 90, None).render();
        assert!(text.contains("No commits in window"));
        assert!(text.contains("last 90 days"));
        assert!(!text.contains("Velocity"));
    }

    #[test]
    fn test_render_report() {
        let text = render(&analyze(&sample()), 30, None).render();
        assert!(text.contains("Bug/feature ratio:"));
        assert!(text.contains("2026-10:    3 tasks"));
        assert!(text.contains("Monday"));
        assert!(!text.contains("Sunday"));
    }

    #[tokio::test]
    async fn test_fetch_excludes_merges() {
        let log = format!(
            "{}|ana|2026-10-12T10:00:00+00:00|feat: add export\n",
            hash("1")
        );
        let runner = ScriptedRunner::git_repo().on("git log", &log);
        let commits = fetch(&runner, 90).await.unwrap();
        assert_eq!(commits.len(), 1);
        let calls = runner.calls.lock().unwrap();
        assert!(calls
            .iter()
            .any(|c| c.contains("--since=90 days ago --no-merges")));
    }
}
