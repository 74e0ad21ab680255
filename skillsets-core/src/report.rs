//! Plain-text report assembly and the small formatting helpers shared by skills.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::ReportSection;

pub const DEFAULT_WIDTH: usize = 100;

/// An ordered list of sections rendered under a banner.
#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    pub width: usize,
    pub generated_at: Option<NaiveDateTime>,
    pub meta: Vec<(String, String)>,
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            width: DEFAULT_WIDTH,
            generated_at: None,
            meta: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_timestamp(mut self, at: Option<NaiveDateTime>) -> Self {
        self.generated_at = at;
        self
    }

    pub fn meta(&mut self, label: impl Into<String>, value: impl ToString) -> &mut Self {
        self.meta.push((label.into(), value.to_string()));
        self
    }

    pub fn push(&mut self, section: ReportSection) -> &mut Self {
        self.sections.push(section);
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let heavy = rule('=', self.width);
        let light = rule('-', self.width);

        out.push_str(&heavy);
        out.push('\n');
        out.push_str(&self.title);
        out.push('\n');
        out.push_str(&heavy);
        out.push('\n');

        if let Some(at) = self.generated_at {
            out.push_str(&format!("Generated: {}\n", at.format("%Y-%m-%d %H:%M:%S")));
        }
        for (label, value) in &self.meta {
            out.push_str(&format!("{label}: {value}\n"));
        }
        if self.generated_at.is_some() || !self.meta.is_empty() {
            out.push_str(&heavy);
            out.push('\n');
        }

        for section in &self.sections {
            out.push('\n');
            if !section.title.is_empty() {
                out.push_str(&section.title);
                out.push('\n');
                out.push_str(&light);
                out.push('\n');
            }
            for line in &section.lines {
                out.push_str(line);
                out.push('\n');
            }
        }

        out.push('\n');
        out.push_str(&heavy);
        out.push('\n');
        out
    }
}

pub fn rule(ch: char, width: usize) -> String {
    std::iter::repeat(ch).take(width).collect()
}

/// Bar of `█` proportional to `value / max`, truncated to whole cells.
pub fn bar(value: f64, max: f64, width: usize) -> String {
    "█".repeat(cells(value, max, width))
}

/// Bracketed gauge such as `[████░░░░░░]`.
pub fn gauge(value: f64, max: f64, width: usize) -> String {
    let filled = cells(value, max, width);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(width - filled))
}

fn cells(value: f64, max: f64, width: usize) -> usize {
    if max <= 0.0 || value <= 0.0 {
        return 0;
    }
    let n = (value / max * width as f64) as usize;
    n.min(width)
}

/// Percentage of `part` in `total`, zero when `total` is zero.
pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Left-aligns to `width` characters.
pub fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{s}{}", " ".repeat(width - len))
    }
}

/// Right-aligns to `width` characters.
pub fn pad_left(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{}{s}", " ".repeat(width - len))
    }
}

/// Keeps the tail of long paths: `...` followed by the last `max - 3` characters.
pub fn truncate_start(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let tail: String = s.chars().skip(len - keep).collect();
    format!("...{tail}")
}

/// Cuts long text to `max` characters, ending in `...`.
pub fn truncate_end(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{head}...")
}

pub fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes}B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Writes `content` to `dir/file_name`, creating `dir` if needed.
pub fn write_report(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    let path = dir.join(file_name);
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), bytes = content.len(), "Report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_bar_and_gauge() {
        assert_eq!(bar(5.0, 10.0, 10), "█████");
        assert_eq!(bar(3.0, 0.0, 10), "");
        assert_eq!(bar(20.0, 10.0, 4), "████");
        assert_eq!(gauge(1.0, 4.0, 4), "[█░░░]");
        assert_eq!(gauge(0.0, 4.0, 2), "[░░]");
    }

    #[test]
    fn test_percent_guards_zero() {
        assert_eq!(percent(1, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }

    #[test]
    fn test_padding_counts_chars() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("abcdef", 4), "abcdef");
        assert_eq!(pad_left("7", 3), "  7");
        assert_eq!(pad("日本", 3), "日本 ");
    }

    #[test]
    fn test_truncation() {
        assert_eq!(truncate_start("abcdefghij", 8), "...fghij");
        assert_eq!(truncate_start("short", 8), "short");
        assert_eq!(truncate_end("abcdefghij", 6), "abc...");
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512B");
        assert_eq!(human_size(2048), "2.0KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0MB");
    }

    #[test]
    fn test_render_layout() {
        let mut section = ReportSection::new("Summary");
        section.line("total: 3");

        let mut report = Report::new("Demo").with_width(10).with_timestamp(Some(
            NaiveDate::from_ymd_opt(2026, 1, 2)
                .unwrap()
                .and_hms_opt(3, 4, 5)
                .unwrap(),
        ));
        report.meta("Repo", "x").push(section);

        let expected = "\
==========
Demo
==========
Generated: 2026-01-02 03:04:05
Repo: x
==========

Summary
----------
total: 3

==========
";
        similar_asserts::assert_eq!(report.render(), expected);
    }

    #[test]
    fn test_render_without_timestamp_is_stable() {
        let report = Report::new("Demo").with_width(4);
        assert_eq!(report.render(), report.render());
        assert!(!report.render().contains("Generated"));
    }

    #[test]
    fn test_write_report_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let path = write_report(&out, "r.txt", "hello").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }
}
