//! Context-switch monitoring: how often consecutive commits jump between
//! modules or across idle gaps, and where uninterrupted focus happened.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::git;
use crate::models::{CommitRecord, ReportSection};
use crate::paths;
use crate::report::{pad, percent, rule, truncate_end, Report};
use crate::runner::CommandRunner;
use crate::skills::ranked;

pub const REPORT_FILE: &str = "context_switch_report.txt";

/// Minutes it takes to regain focus after an interruption.
pub const RECOVERY_MINUTES: usize = 23;

const WIDTH: usize = 120;

pub struct ContextData {
    /// Window actually used; widened when the requested one was empty.
    pub days: i64,
    /// Oldest first.
    pub commits: Vec<CommitRecord>,
}

/// Reads the last `days` of history, widening to three times the window once
/// when it is empty. Fails with [`Error::NoData`] if both are empty.
pub async fn fetch(runner: &dyn CommandRunner, days: i64) -> Result<ContextData> {
    git::ensure_repo(runner).await?;

    for window in [days, days * 3] {
        let since = git::since_arg(window);
        let mut commits = git::log(runner, &[since.as_str(), "--name-only"]).await?;
        if commits.is_empty() {
            tracing::warn!(days = window, "No commits in window");
            continue;
        }
        commits.sort_by_key(|c| c.timestamp);
        return Ok(ContextData {
            days: window,
            commits,
        });
    }

    Err(Error::NoData(format!(
        "no commits in the last {} days",
        days * 3
    )))
}

/// Most frequent module among the commit's files; ties go to the one seen first.
pub fn main_module(commit: &CommitRecord) -> String {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for file in &commit.files {
        let module = paths::extract_module(&file.path);
        match counts.iter_mut().find(|(m, _)| *m == module) {
            Some((_, n)) => *n += 1,
            None => counts.push((module, 1)),
        }
    }

    let mut best: Option<&(String, usize)> = None;
    for entry in &counts {
        if best.map_or(true, |b| entry.1 > b.1) {
            best = Some(entry);
        }
    }
    best.map(|(m, _)| m.clone())
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    /// Position of the commit the switch lands on.
    pub index: usize,
    pub from_commit: String,
    pub to_commit: String,
    pub from_module: String,
    pub to_module: String,
    pub at: DateTime<FixedOffset>,
    pub gap: Duration,
    pub module_switch: bool,
    pub time_gap: bool,
    pub message: String,
}

impl Switch {
    pub fn kinds(&self) -> String {
        let mut kinds = Vec::new();
        if self.module_switch {
            kinds.push("module");
        }
        if self.time_gap {
            kinds.push("time_gap");
        }
        kinds.join(",")
    }
}

/// Compares each commit with its predecessor. `commits` must be oldest first.
pub fn detect_switches(commits: &[CommitRecord], gap_threshold: Duration) -> Vec<Switch> {
    let modules: Vec<String> = commits.iter().map(main_module).collect();

    commits
        .windows(2)
        .zip(modules.windows(2))
        .enumerate()
        .filter_map(|(i, (pair, mods))| {
            let (prev, curr) = (&pair[0], &pair[1]);
            let gap = curr.timestamp.signed_duration_since(prev.timestamp);
            let module_switch = mods[0] != mods[1];
            let time_gap = gap > gap_threshold;
            (module_switch || time_gap).then(|| Switch {
                index: i + 1,
                from_commit: prev.short_hash().to_string(),
                to_commit: curr.short_hash().to_string(),
                from_module: mods[0].clone(),
                to_module: mods[1].clone(),
                at: curr.timestamp,
                gap,
                module_switch,
                time_gap,
                message: curr.message.clone(),
            })
        })
        .collect()
}

/// 0 to 100, one decimal. Weighs switches per commit at 70% and module
/// spread (5 points per distinct module) at 30%.
pub fn fragmentation_index(commits: &[CommitRecord], switches: &[Switch]) -> f64 {
    if commits.len() < 2 {
        return 0.0;
    }
    let switch_ratio = switches.len() as f64 / commits.len() as f64 * 100.0;
    let modules: std::collections::HashSet<String> = commits
        .iter()
        .flat_map(|c| c.files.iter().map(|f| paths::extract_module(&f.path)))
        .collect();
    let diversity = modules.len() as f64 * 5.0;
    let index = (switch_ratio * 0.7 + diversity * 0.3).min(100.0);
    (index * 10.0).round() / 10.0
}

/// Grade, description and icon for a fragmentation index.
pub fn fragmentation_grade(index: f64) -> (&'static str, &'static str, &'static str) {
    if index <= 25.0 {
        ("Excellent", "Highly focused; a very healthy work pattern", "✅")
    } else if index <= 50.0 {
        ("Good", "Reasonably focused with some context switching", "👍")
    } else if index <= 75.0 {
        ("Needs improvement", "Scattered work with frequent context switches", "⚠️")
    } else {
        ("Poor", "Highly fragmented; attention is spread thin", "❌")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusPeriod {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub commits: usize,
    pub main_module: String,
    pub switches: usize,
}

impl FocusPeriod {
    pub fn duration(&self) -> Duration {
        self.end.signed_duration_since(self.start)
    }
}

/// Work sessions bounded by idle gaps that lasted at least `min_duration`
/// and contained at most two module switches. Longest first, at most ten.
pub fn focus_periods(
    commits: &[CommitRecord],
    switches: &[Switch],
    min_duration: Duration,
) -> Vec<FocusPeriod> {
    if commits.len() < 3 {
        return Vec::new();
    }

    let by_target: HashMap<usize, &Switch> = switches.iter().map(|s| (s.index, s)).collect();

    let mut periods = Vec::new();
    let mut start = 0;
    let mut module_switches = 0;

    let mut close = |from: usize, to: usize, module_switches: usize| {
        let session = &commits[from..=to];
        if session.len() < 2 {
            return;
        }
        let first = session[0].timestamp;
        let last = session[session.len() - 1].timestamp;
        if last.signed_duration_since(first) < min_duration || module_switches > 2 {
            return;
        }
        let mut counts: HashMap<String, usize> = HashMap::new();
        for c in session {
            for f in &c.files {
                *counts.entry(paths::extract_module(&f.path)).or_default() += 1;
            }
        }
        let main_module = ranked(&counts)
            .first()
            .map(|(m, _)| m.clone())
            .unwrap_or_else(|| "unknown".to_string());
        periods.push(FocusPeriod {
            start: first,
            end: last,
            commits: session.len(),
            main_module,
            switches: module_switches,
        });
    };

    for i in 1..commits.len() {
        match by_target.get(&i) {
            Some(s) if s.time_gap => {
                close(start, i - 1, module_switches);
                start = i;
                module_switches = 0;
            }
            Some(_) => module_switches += 1,
            None => {}
        }
    }
    close(start, commits.len() - 1, module_switches);

    periods.sort_by(|a, b| b.duration().cmp(&a.duration()).then(a.start.cmp(&b.start)));
    periods.truncate(10);
    periods
}

/// `H:MM:SS` below a day, whole days above.
pub fn format_gap(d: Duration) -> String {
    let days = d.num_days();
    if days >= 1 {
        return format!("{days} day{}", if days == 1 { "" } else { "s" });
    }
    let secs = d.num_seconds().max(0);
    format!("{}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
}

#[derive(Debug, Clone)]
pub struct ContextAnalysis {
    pub commits: usize,
    pub span_days: i64,
    pub switches: Vec<Switch>,
    pub focus_periods: Vec<FocusPeriod>,
    pub fragmentation: f64,
    pub module_activity: Vec<(String, usize)>,
    pub transitions: Vec<((String, String), usize)>,
    pub focus_minutes: i64,
}

impl ContextAnalysis {
    pub fn module_switches(&self) -> usize {
        self.switches.iter().filter(|s| s.module_switch).count()
    }

    pub fn time_gaps(&self) -> usize {
        self.switches.iter().filter(|s| s.time_gap).count()
    }

    pub fn recovery_hours(&self) -> f64 {
        (self.switches.len() * RECOVERY_MINUTES) as f64 / 60.0
    }

    pub fn recommendations(&self) -> Vec<&'static str> {
        let mut recs = Vec::new();
        if self.fragmentation > 50.0 {
            recs.push("Batch similar tasks to cut down on switching between modules");
            recs.push("Reserve fixed time blocks for work on a specific module");
        }
        if self.focus_periods.len() < 3 {
            recs.push("Schedule at least one deep-work block of 45+ minutes a day");
            recs.push("Silence notifications during deep-work blocks");
        }
        if self.module_switches() as f64 > self.commits as f64 * 0.5 {
            recs.push("Prefer atomic commits that finish one related task at a time");
            recs.push("Jot down the current task so an interruption costs less");
        }
        if self.time_gaps() as f64 > self.commits as f64 * 0.3 {
            recs.push("Reduce fragmented working time; group work into longer stretches");
        }
        recs
    }
}

pub fn analyze(commits: &[CommitRecord], gap_minutes: i64, focus_minutes: i64) -> ContextAnalysis {
    let switches = detect_switches(commits, Duration::minutes(gap_minutes));
    let focus = focus_periods(commits, &switches, Duration::minutes(focus_minutes));
    let fragmentation = fragmentation_index(commits, &switches);

    let mut modules: HashMap<String, usize> = HashMap::new();
    for c in commits {
        for f in &c.files {
            *modules.entry(paths::extract_module(&f.path)).or_default() += 1;
        }
    }

    let mut transitions: HashMap<(String, String), usize> = HashMap::new();
    for s in switches.iter().filter(|s| s.module_switch) {
        *transitions
            .entry((s.from_module.clone(), s.to_module.clone()))
            .or_default() += 1;
    }

    let span_days = match (commits.first(), commits.last()) {
        (Some(first), Some(last)) => last.timestamp.signed_duration_since(first.timestamp).num_days(),
        _ => 0,
    };

    ContextAnalysis {
        commits: commits.len(),
        span_days,
        switches,
        focus_periods: focus,
        fragmentation,
        module_activity: ranked(&modules),
        transitions: ranked(&transitions),
        focus_minutes,
    }
}

fn minute(ts: &DateTime<FixedOffset>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

pub fn render(analysis: &ContextAnalysis, generated_at: Option<NaiveDateTime>) -> Report {
    let mut report = Report::new("Context Switch Analysis")
        .with_width(WIDTH)
        .with_timestamp(generated_at);

    let mut stats = ReportSection::new("📊 Overview");
    stats.line(format!("Commits analyzed: {}", analysis.commits));
    stats.line(format!("Time span: {} days", analysis.span_days));
    if analysis.span_days > 0 {
        stats.line(format!(
            "Commits per day: {:.1}",
            analysis.commits as f64 / analysis.span_days as f64
        ));
    }
    report.push(stats);

    let mut switching = ReportSection::new("🔄 Context Switches");
    switching.line(format!("Total switches: {}", analysis.switches.len()));
    if analysis.span_days > 0 {
        switching.line(format!(
            "Switches per day: {:.1}",
            analysis.switches.len() as f64 / analysis.span_days as f64
        ));
    }
    switching.line(format!("  - module switches: {}", analysis.module_switches()));
    switching.line(format!("  - time-gap switches: {}", analysis.time_gaps()));
    report.push(switching);

    let total_touches: usize = analysis.module_activity.iter().map(|(_, n)| n).sum();
    let mut modules = ReportSection::new("📁 Module Activity");
    modules.line(format!("Modules touched: {}", analysis.module_activity.len()));
    modules.blank();
    modules.line("Most active (top 10):");
    for (module, count) in analysis.module_activity.iter().take(10) {
        modules.line(format!(
            "  - {} {count:>4} changes ({:>5.1}%)",
            pad(module, 20),
            percent(*count, total_touches)
        ));
    }
    report.push(modules);

    let mut paths = ReportSection::new("🔀 Common Switch Paths");
    if analysis.transitions.is_empty() {
        paths.line("  No notable module switches");
    } else {
        paths.line("Most frequent (top 10):");
        for ((from, to), count) in analysis.transitions.iter().take(10) {
            paths.line(format!("  - {} → {} ({count} times)", pad(from, 15), pad(to, 15)));
        }
    }
    report.push(paths);

    let mut focus = ReportSection::new("🎯 Focus Periods");
    focus.line(format!(
        "Found {} focus periods (at least {} minutes of continuous work)",
        analysis.focus_periods.len(),
        analysis.focus_minutes
    ));
    focus.blank();
    if analysis.focus_periods.is_empty() {
        focus.line("  No clear focus periods detected");
        focus.line("  Try cutting interruptions and working in longer stretches");
    } else {
        focus.line(format!(
            "{} {} {} {} Switches",
            pad("Start", 20),
            pad("Duration", 12),
            pad("Commits", 8),
            pad("Main module", 15)
        ));
        focus.line(rule('-', WIDTH));
        for p in &analysis.focus_periods {
            focus.line(format!(
                "{} {} {} {} {}",
                pad(&minute(&p.start), 20),
                pad(&format_gap(p.duration()), 12),
                pad(&p.commits.to_string(), 8),
                pad(&p.main_module, 15),
                p.switches
            ));
        }
    }
    report.push(focus);

    let (grade, description, icon) = fragmentation_grade(analysis.fragmentation);
    let mut frag = ReportSection::new("📈 Fragmentation");
    frag.line(format!("Fragmentation index: {}/100", analysis.fragmentation));
    frag.blank();
    frag.line(format!("{icon} Focus grade: {grade}"));
    frag.line(description);
    report.push(frag);

    if !analysis.switches.is_empty() {
        let mut cost = ReportSection::new("⏱️ Switching Cost");
        cost.line(format!("Total switches: {}", analysis.switches.len()));
        cost.line(format!("Estimated recovery time: {:.1} hours", analysis.recovery_hours()));
        cost.line(format!(
            "  (assuming {RECOVERY_MINUTES} minutes to regain focus after each switch)"
        ));
        report.push(cost);
    }

    let mut recs = ReportSection::new("💡 Recommendations");
    let targeted = analysis.recommendations();
    if !targeted.is_empty() {
        recs.line("Targeted:");
        for r in targeted {
            recs.line(format!("  📌 {r}"));
        }
        recs.blank();
    }
    recs.line("General:");
    recs.line("  📌 Try the Pomodoro technique (25 minutes of focus, 5 minutes of rest)");
    recs.line("  📌 Create a branch per task to isolate its context");
    recs.line("  📌 Revisit this report regularly to track how your habits change");
    recs.line("  📌 Handle chores when energy is low and core work when it is high");
    report.push(recs);

    if !analysis.switches.is_empty() {
        let mut recent = ReportSection::new("📋 Recent Switches (last 20)");
        recent.line(format!(
            "{} {} {} {} {} Message",
            pad("Time", 20),
            pad("Type", 15),
            pad("From", 15),
            pad("To", 15),
            pad("Gap", 12)
        ));
        recent.line(rule('-', WIDTH));
        let skip = analysis.switches.len().saturating_sub(20);
        for s in &analysis.switches[skip..] {
            recent.line(format!(
                "{} {} {} {} {} {}",
                pad(&minute(&s.at), 20),
                pad(&s.kinds(), 15),
                pad(&s.from_module, 15),
                pad(&s.to_module, 15),
                pad(&format_gap(s.gap), 12),
                truncate_end(&s.message, 30)
            ));
        }
        report.push(recent);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeStatus;
    use crate::runner::fake::ScriptedRunner;
    use crate::skills::fixtures::{commit, hash};

    fn touching(tag: &str, date: &str, files: &[&str]) -> CommitRecord {
        files.iter().fold(
            commit(&hash(tag), "dev", date, &format!("change {tag}")),
            |c, f| c.with_file(*f, ChangeStatus::Other),
        )
    }

    fn day() -> Vec<CommitRecord> {
        vec![
            touching("a1", "2026-03-02T09:00:00+00:00", &["src/api/a.rs", "src/api/b.rs"]),
            touching("a2", "2026-03-02T09:20:00+00:00", &["src/api/c.rs"]),
            touching("a3", "2026-03-02T09:45:00+00:00", &["src/api/d.rs", "docs/x.md"]),
            touching("b1", "2026-03-02T14:00:00+00:00", &["web/ui.css"]),
            touching("b2", "2026-03-02T14:10:00+00:00", &["src/api/e.rs"]),
        ]
    }

    #[test]
    fn test_main_module() {
        let c = touching("c1", "2026-03-02T09:00:00+00:00", &["docs/a.md", "src/db/x.rs", "src/db/y.rs"]);
        assert_eq!(main_module(&c), "db");
        let tie = touching("c2", "2026-03-02T09:00:00+00:00", &["web/a.css", "docs/a.md"]);
        assert_eq!(main_module(&tie), "web");
        let empty = touching("c3", "2026-03-02T09:00:00+00:00", &[]);
        assert_eq!(main_module(&empty), "unknown");
    }

    #[test]
    fn test_detect_switches() {
        let switches = detect_switches(&day(), Duration::minutes(30));
        assert_eq!(switches.len(), 2);

        assert_eq!(switches[0].from_module, "api");
        assert_eq!(switches[0].to_module, "web");
        assert_eq!(switches[0].index, 3);
        assert!(switches[0].module_switch && switches[0].time_gap);
        assert_eq!(switches[0].kinds(), "module,time_gap");

        assert!(switches[1].module_switch && !switches[1].time_gap);
        assert_eq!(format_gap(switches[1].gap), "0:10:00");
    }

    #[test]
    fn test_fragmentation_index() {
        let commits = day();
        let switches = detect_switches(&commits, Duration::minutes(30));
        // 2/5 switches = 40 * 0.7 = 28; modules api, docs, web = 15 * 0.3 = 4.5
        assert_eq!(fragmentation_index(&commits, &switches), 32.5);
        assert_eq!(fragmentation_index(&commits[..1], &[]), 0.0);
        assert_eq!(fragmentation_grade(32.5).0, "Good");
        assert_eq!(fragmentation_grade(25.0).0, "Excellent");
        assert_eq!(fragmentation_grade(80.0).0, "Poor");
    }

    #[test]
    fn test_focus_periods() {
        let commits = day();
        let switches = detect_switches(&commits, Duration::minutes(30));
        let periods = focus_periods(&commits, &switches, Duration::minutes(45));
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].commits, 3);
        assert_eq!(periods[0].main_module, "api");
        assert_eq!(periods[0].duration(), Duration::minutes(45));

        let strict = focus_periods(&commits, &switches, Duration::minutes(60));
        assert!(strict.is_empty());
    }

    #[test]
    fn test_focus_periods_with_shared_hash_prefix() {
        let commits: Vec<CommitRecord> = day()
            .into_iter()
            .enumerate()
            .map(|(i, mut c)| {
                c.hash = format!("deadbeef{i:0>32}");
                c
            })
            .collect();
        assert!(commits.iter().all(|c| c.short_hash() == "deadbeef"));

        let switches = detect_switches(&commits, Duration::minutes(30));
        let periods = focus_periods(&commits, &switches, Duration::minutes(45));
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].commits, 3);
        assert_eq!(periods[0].switches, 0);
    }

    #[test]
    fn test_analyze_and_render() {
        let analysis = analyze(&day(), 30, 45);
        assert_eq!(analysis.module_switches(), 2);
        assert_eq!(analysis.time_gaps(), 1);
        assert_eq!(analysis.module_activity[0], ("api".to_string(), 5));
        assert_eq!(analysis.transitions.len(), 2);

        let text = render(&analysis, None).render();
        assert!(text.contains("Total switches: 2"));
        assert!(text.contains("Fragmentation index: 32.5/100"));
        assert!(text.contains("👍 Focus grade: Good"));
        assert!(text.contains("Estimated recovery time: 0.8 hours"));
        assert!(text.contains("module,time_gap"));
    }

    #[test]
    fn test_format_gap() {
        assert_eq!(format_gap(Duration::minutes(75)), "1:15:00");
        assert_eq!(format_gap(Duration::hours(30)), "1 day");
        assert_eq!(format_gap(Duration::days(3)), "3 days");
    }

    #[tokio::test]
    async fn test_fetch_widens_window() {
        let log = format!(
            "{}|dev|2026-03-02T10:00:00+00:00|later\nsrc/a/x.rs\n\n{}|dev|2026-03-02T09:00:00+00:00|earlier\nsrc/b/y.rs\n",
            hash("2"),
            hash("1")
        );
        let runner = ScriptedRunner::git_repo()
            .on(&format!("git log {} --since=10 days ago", git::LOG_FORMAT), "")
            .on(&format!("git log {} --since=30 days ago", git::LOG_FORMAT), &log);

        let data = fetch(&runner, 10).await.unwrap();
        assert_eq!(data.days, 30);
        assert_eq!(data.commits[0].message, "earlier");
        assert_eq!(data.commits[1].files[0].path, "src/a/x.rs");
    }

    #[tokio::test]
    async fn test_fetch_empty_history() {
        let runner = ScriptedRunner::git_repo().on("git log", "");
        assert!(matches!(fetch(&runner, 10).await, Err(Error::NoData(_))));
    }
}
