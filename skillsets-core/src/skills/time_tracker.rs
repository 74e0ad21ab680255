//! When work happens: commits bucketed by hour of day and weekday, in each
//! author's own timezone.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Timelike};

use crate::error::{Error, Result};
use crate::git;
use crate::models::{CommitRecord, ReportSection};
use crate::report::{bar, pad, pad_left, percent, rule, Report};
use crate::runner::CommandRunner;
use crate::skills::WEEKDAYS;

pub const REPORT_FILE: &str = "time_tracker_report.txt";

const WIDTH: usize = 100;
const INTENSITY: [char; 5] = [' ', '░', '▒', '▓', '█'];

/// Full history across all refs. An empty history is an error.
pub async fn fetch(runner: &dyn CommandRunner) -> Result<Vec<CommitRecord>> {
    git::ensure_repo(runner).await?;
    let commits = git::log(runner, &["--all"]).await?;
    if commits.is_empty() {
        return Err(Error::NoData("the repository has no commits".to_string()));
    }
    tracing::info!(count = commits.len(), "Fetched commit times");
    Ok(commits)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Periods {
    /// 06:00-11:59
    pub morning: usize,
    /// 12:00-17:59
    pub afternoon: usize,
    /// 18:00-23:59
    pub evening: usize,
    /// 00:00-05:59
    pub night: usize,
}

impl Periods {
    fn from_hours(hourly: &[usize; 24]) -> Self {
        let sum = |range: std::ops::Range<usize>| -> usize { hourly[range].iter().sum() };
        Periods {
            night: sum(0..6),
            morning: sum(6..12),
            afternoon: sum(12..18),
            evening: sum(18..24),
        }
    }

    pub fn daytime(&self) -> usize {
        self.morning + self.afternoon
    }

    pub fn nighttime(&self) -> usize {
        self.evening + self.night
    }

    /// The period with strictly more commits than every other one; late-night
    /// coding is reported whenever no period dominates and there is some.
    pub fn persona(&self) -> Option<&'static str> {
        let Periods {
            morning,
            afternoon,
            evening,
            night,
        } = *self;
        if morning > afternoon && morning > evening && morning > night {
            Some("✨ Morning developer: you are most productive in the morning; schedule important work then")
        } else if afternoon > morning && afternoon > evening && afternoon > night {
            Some("✨ Afternoon developer: you are most productive in the afternoon; schedule important work then")
        } else if evening > morning && evening > afternoon && evening > night {
            Some("✨ Evening developer: you are most productive in the evening; schedule important work then")
        } else if night > 0 {
            Some("✨ Night owl: you often code late at night; remember to rest")
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeStats {
    pub total: usize,
    pub first: DateTime<FixedOffset>,
    pub last: DateTime<FixedOffset>,
    pub hourly: [usize; 24],
    /// Monday first.
    pub weekday: [usize; 7],
    pub grid: [[usize; 24]; 7],
}

impl TimeStats {
    pub fn workday(&self) -> usize {
        self.weekday[..5].iter().sum()
    }

    pub fn weekend(&self) -> usize {
        self.weekday[5..].iter().sum()
    }

    pub fn periods(&self) -> Periods {
        Periods::from_hours(&self.hourly)
    }

    /// Up to three busiest hours, earliest first on ties.
    pub fn peak_hours(&self) -> Vec<(usize, usize)> {
        let mut hours: Vec<(usize, usize)> = self
            .hourly
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, n)| *n > 0)
            .collect();
        hours.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        hours.truncate(3);
        hours
    }

    pub fn busiest_day(&self) -> (usize, usize) {
        busiest(&self.weekday)
    }

    pub fn busiest_hour(&self) -> (usize, usize) {
        busiest(&self.hourly)
    }

    /// Heatmap cell for `day` and `hour`, scaled against that day's busiest hour.
    pub fn intensity(&self, day: usize, hour: usize) -> char {
        let row = &self.grid[day];
        let max = row.iter().copied().max().unwrap_or(0);
        let count = row[hour];
        if count == 0 || max == 0 {
            return INTENSITY[0];
        }
        INTENSITY[(count * 4 / max).min(4)]
    }
}

fn busiest(counts: &[usize]) -> (usize, usize) {
    counts
        .iter()
        .copied()
        .enumerate()
        .fold((0, 0), |best, (i, n)| if n > best.1 { (i, n) } else { best })
}

fn ratio_label(a: usize, b: usize) -> String {
    if b == 0 {
        "∞:1".to_string()
    } else {
        format!("{:.1}:1", a as f64 / b as f64)
    }
}

pub fn analyze(commits: &[CommitRecord]) -> Result<TimeStats> {
    let first = commits.iter().map(|c| c.timestamp).min();
    let last = commits.iter().map(|c| c.timestamp).max();
    let (Some(first), Some(last)) = (first, last) else {
        return Err(Error::NoData("no commits to analyze".to_string()));
    };

    let mut stats = TimeStats {
        total: commits.len(),
        first,
        last,
        hourly: [0; 24],
        weekday: [0; 7],
        grid: [[0; 24]; 7],
    };
    for commit in commits {
        let hour = commit.timestamp.hour() as usize;
        let day = commit.timestamp.weekday().num_days_from_monday() as usize;
        stats.hourly[hour] += 1;
        stats.weekday[day] += 1;
        stats.grid[day][hour] += 1;
    }
    Ok(stats)
}

pub fn render(stats: &TimeStats, generated_at: Option<NaiveDateTime>) -> Report {
    let mut report = Report::new("Coding Time Analysis")
        .with_width(WIDTH)
        .with_timestamp(generated_at);
    report.meta("Total commits", stats.total).meta(
        "Range",
        format!(
            "{} ~ {}",
            stats.first.format("%Y-%m-%d %H:%M"),
            stats.last.format("%Y-%m-%d %H:%M")
        ),
    );

    let total = stats.total;
    let workday = stats.workday();
    let weekend = stats.weekend();

    let mut days = ReportSection::new("📈 Commits by Weekday");
    for (name, count) in WEEKDAYS.iter().zip(stats.weekday) {
        let share = percent(count, total);
        days.line(format!(
            "  {} │ {} {} commits ({share:5.1}%)",
            pad(name, 9),
            pad(&bar(share, 100.0, 50), 50),
            pad_left(&count.to_string(), 4)
        ));
    }
    days.blank();
    days.line("Workdays vs weekend:");
    days.line(format!(
        "  Workdays (Mon-Fri): {workday} ({:.1}%)",
        percent(workday, total)
    ));
    days.line(format!(
        "  Weekend (Sat-Sun):  {weekend} ({:.1}%)",
        percent(weekend, total)
    ));
    report.push(days);

    let mut hours = ReportSection::new("⏰ Commits by Hour");
    let max_hour = stats.hourly.iter().copied().max().unwrap_or(0);
    for (hour, count) in stats.hourly.iter().enumerate() {
        hours.line(format!(
            "  {hour:02}:00 │ {} {count}",
            bar(*count as f64, max_hour as f64, 50)
        ));
    }
    hours.blank();
    hours.line("🔥 Busiest hours (top 3):");
    for (hour, count) in stats.peak_hours() {
        hours.line(format!("  {hour:02}:00 - {hour:02}:59 │ {count} commits"));
    }
    let periods = stats.periods();
    hours.blank();
    hours.line("Periods:");
    for (label, count) in [
        ("Morning   (06:00-11:59)", periods.morning),
        ("Afternoon (12:00-17:59)", periods.afternoon),
        ("Evening   (18:00-23:59)", periods.evening),
        ("Night     (00:00-05:59)", periods.night),
    ] {
        hours.line(format!("  {label}: {count} ({:.1}%)", percent(count, total)));
    }
    report.push(hours);

    let mut heatmap = ReportSection::new("🗺️ Heatmap (weekday x hour)");
    let header: String = (0..24).map(|h| format!("{h:02}  ")).collect();
    heatmap.line(format!("          {}", header.trim_end()));
    heatmap.line(format!("          {}", rule('─', 96)));
    for (day, name) in WEEKDAYS.iter().enumerate() {
        let cells: String = (0..24)
            .map(|hour| format!("{}   ", stats.intensity(day, hour)))
            .collect();
        heatmap.line(format!("{}│{}", pad(name, 9), cells.trim_end()));
    }
    report.push(heatmap);

    let (top_day, top_day_count) = stats.busiest_day();
    let (top_hour, top_hour_count) = stats.busiest_hour();
    let mut insights = ReportSection::new("💡 Insights");
    insights.line(format!(
        "Busiest weekday: {} ({top_day_count} commits)",
        WEEKDAYS[top_day]
    ));
    insights.line(format!(
        "Busiest hour: {top_hour:02}:00-{top_hour:02}:59 ({top_hour_count} commits)"
    ));
    insights.blank();
    if workday > weekend {
        insights.line(format!(
            "Weekday coder: workday/weekend ratio about {}",
            ratio_label(workday, weekend)
        ));
    } else {
        insights.line(format!(
            "Weekend coder: weekend/workday ratio about {}",
            ratio_label(weekend, workday)
        ));
    }
    if periods.daytime() > periods.nighttime() {
        insights.line(format!(
            "Daytime coder: day/night ratio about {}",
            ratio_label(periods.daytime(), periods.nighttime())
        ));
    } else {
        insights.line(format!(
            "Night-time coder: night/day ratio about {}",
            ratio_label(periods.nighttime(), periods.daytime())
        ));
    }
    insights.line(format!(
        "Average per weekday: {:.1} commits",
        total as f64 / 7.0
    ));
    report.push(insights);

    let mut advice = ReportSection::new("📝 Recommendations");
    if let Some(persona) = periods.persona() {
        advice.line(persona);
    }
    if workday > weekend * 2 {
        advice.line("💼 Workday focus: heavy weekday investment; take the weekends off");
    } else if weekend > workday {
        advice.line("🎨 Weekend programmer: lots of weekend activity, typical of hobby and open source work");
    }
    report.push(advice);

    report
}
