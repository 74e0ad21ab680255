//! Test coverage from existing coverage.py or istanbul (jest/vitest) JSON
//! output.

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::ReportSection;
use crate::report::{gauge, Report};
use crate::runner::CommandRunner;

pub const REPORT_FILE: &str = "test_coverage_report.txt";

const WIDTH: usize = 80;
const PYTHON_DATA: &str = ".coverage";
const PYTHON_JSON: &str = "coverage.json";
const ISTANBUL_FILES: [&str; 3] = [
    "coverage/coverage-final.json",
    "coverage/coverage.json",
    "coverage.json",
];
const PYTHON_PROJECT_MARKERS: [&str; 3] = ["pytest.ini", "setup.py", "pyproject.toml"];
const COVERAGE_JSON_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageFormat {
    Python,
    JavaScript,
}

impl CoverageFormat {
    pub fn tool(&self) -> &'static str {
        match self {
            CoverageFormat::Python => "coverage.py",
            CoverageFormat::JavaScript => "jest/vitest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl Level {
    pub const ALL: [Level; 5] = [
        Level::Excellent,
        Level::Good,
        Level::Fair,
        Level::Poor,
        Level::Critical,
    ];

    pub fn from_percent(pct: f64) -> Self {
        if pct >= 90.0 {
            Level::Excellent
        } else if pct >= 75.0 {
            Level::Good
        } else if pct >= 50.0 {
            Level::Fair
        } else if pct >= 25.0 {
            Level::Poor
        } else {
            Level::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Excellent => "Excellent",
            Level::Good => "Good",
            Level::Fair => "Fair",
            Level::Poor => "Poor",
            Level::Critical => "Critical",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Level::Excellent | Level::Good => "🟢",
            Level::Fair => "🟡",
            Level::Poor => "🟠",
            Level::Critical => "🔴",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileCoverage {
    pub path: String,
    pub statements: usize,
    pub covered: usize,
    pub missing: usize,
    pub branches: usize,
    pub covered_branches: usize,
    /// Only reported by istanbul.
    pub functions: Option<usize>,
}

impl FileCoverage {
    pub fn coverage(&self) -> f64 {
        ratio(self.covered, self.statements).unwrap_or(0.0)
    }

    pub fn branch_coverage(&self) -> Option<f64> {
        ratio(self.covered_branches, self.branches)
    }

    pub fn level(&self) -> Level {
        Level::from_percent(self.coverage())
    }
}

fn ratio(part: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| part as f64 / total as f64 * 100.0)
}

#[derive(Debug, Clone)]
pub struct CoverageData {
    pub format: CoverageFormat,
    pub source: String,
    pub files: Vec<FileCoverage>,
}

impl CoverageData {
    pub fn total_statements(&self) -> usize {
        self.files.iter().map(|f| f.statements).sum()
    }

    pub fn covered_statements(&self) -> usize {
        self.files.iter().map(|f| f.covered).sum()
    }

    pub fn overall(&self) -> f64 {
        ratio(self.covered_statements(), self.total_statements()).unwrap_or(0.0)
    }

    /// `None` when the data carries no branch information.
    pub fn branch_coverage(&self) -> Option<f64> {
        let total = self.files.iter().map(|f| f.branches).sum();
        let covered = self.files.iter().map(|f| f.covered_branches).sum();
        ratio(covered, total)
    }

    pub fn distribution(&self) -> BTreeMap<Level, usize> {
        let mut counts = BTreeMap::new();
        for file in &self.files {
            *counts.entry(file.level()).or_default() += 1;
        }
        counts
    }

    pub fn zero_coverage(&self) -> Vec<&FileCoverage> {
        self.files.iter().filter(|f| f.coverage() == 0.0).collect()
    }

    /// Partially covered files below 50%, least covered first.
    pub fn low_coverage(&self) -> Vec<&FileCoverage> {
        let mut low: Vec<&FileCoverage> = self
            .files
            .iter()
            .filter(|f| f.coverage() > 0.0 && f.coverage() < 50.0)
            .collect();
        low.sort_by(|a, b| a.coverage().total_cmp(&b.coverage()));
        low
    }

    /// The largest low-coverage files, which are the best places to add tests.
    pub fn priorities(&self) -> Vec<&FileCoverage> {
        let mut low = self.low_coverage();
        low.sort_by(|a, b| b.statements.cmp(&a.statements));
        low.truncate(5);
        low
    }
}

#[derive(Deserialize)]
struct PythonReport {
    files: BTreeMap<String, PythonFile>,
}

#[derive(Deserialize)]
struct PythonFile {
    #[serde(default)]
    summary: PythonSummary,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PythonSummary {
    num_statements: usize,
    covered_lines: usize,
    missing_lines: usize,
    num_branches: usize,
    covered_branches: usize,
}

/// Parses coverage.py's `coverage json` output.
pub fn parse_python(json: &str) -> Result<Vec<FileCoverage>> {
    let report: PythonReport = serde_json::from_str(json)?;
    Ok(report
        .files
        .into_iter()
        .map(|(path, file)| {
            let s = file.summary;
            FileCoverage {
                path,
                statements: s.num_statements,
                covered: s.covered_lines,
                missing: s.missing_lines,
                branches: s.num_branches,
                covered_branches: s.covered_branches,
                functions: None,
            }
        })
        .collect())
}

/// Parses istanbul's per-file map: `s` holds statement hit counts, `b` an array
/// of hit counts per branch and `f` function hit counts.
pub fn parse_istanbul(json: &str) -> Result<Vec<FileCoverage>> {
    let data: BTreeMap<String, Value> = serde_json::from_str(json)?;
    let mut files = Vec::new();

    for (path, entry) in data {
        let Some(entry) = entry.as_object() else {
            continue;
        };
        let hits = |v: &Value| v.as_u64().unwrap_or(0);

        let (statements, covered) = match entry.get("s").and_then(Value::as_object) {
            Some(s) => (s.len(), s.values().filter(|v| hits(*v) > 0).count()),
            None => (0, 0),
        };

        let mut branches = 0;
        let mut covered_branches = 0;
        if let Some(b) = entry.get("b").and_then(Value::as_object) {
            for arms in b.values().filter_map(Value::as_array) {
                branches += arms.len();
                covered_branches += arms.iter().filter(|v| hits(*v) > 0).count();
            }
        }

        let functions = entry.get("f").and_then(Value::as_object).map(|f| f.len());

        files.push(FileCoverage {
            path,
            statements,
            covered,
            missing: statements - covered,
            branches,
            covered_branches,
            functions,
        });
    }
    Ok(files)
}

/// Coverage formats whose data files exist under `root`, Python first.
pub fn detect(root: &Path) -> Vec<CoverageFormat> {
    let mut formats = Vec::new();
    if root.join(PYTHON_DATA).exists() || root.join(PYTHON_JSON).exists() {
        formats.push(CoverageFormat::Python);
    }
    if ISTANBUL_FILES.iter().any(|f| root.join(f).exists()) {
        formats.push(CoverageFormat::JavaScript);
    }
    formats
}

/// Runs `coverage json` to export `.coverage`. Failures are logged; any
/// existing `coverage.json` is still used afterwards.
async fn export_python(runner: &dyn CommandRunner) {
    match runner
        .run_with_timeout("coverage", &["json"], COVERAGE_JSON_TIMEOUT)
        .await
    {
        Ok(out) if out.success => info!("coverage.json regenerated"),
        Ok(out) => warn!(stderr = %out.stderr.trim(), "coverage json failed"),
        Err(Error::ToolNotFound(_)) => warn!("coverage not installed, reading existing data"),
        Err(e) => warn!(error = %e, "coverage json did not finish"),
    }
}

fn load_python(root: &Path) -> Result<Option<CoverageData>> {
    let path = root.join(PYTHON_JSON);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)?;
    match parse_python(&text) {
        Ok(files) => Ok(Some(CoverageData {
            format: CoverageFormat::Python,
            source: PYTHON_JSON.to_string(),
            files,
        })),
        // An istanbul export can share the `coverage.json` name.
        Err(e) => {
            info!(error = %e, "coverage.json is not coverage.py output");
            Ok(None)
        }
    }
}

fn load_istanbul(root: &Path) -> Result<Option<CoverageData>> {
    let Some(name) = ISTANBUL_FILES.iter().find(|f| root.join(f).exists()) else {
        return Ok(None);
    };
    let text = std::fs::read_to_string(root.join(name))?;
    Ok(Some(CoverageData {
        format: CoverageFormat::JavaScript,
        source: name.to_string(),
        files: parse_istanbul(&text)?,
    }))
}

/// Finds and parses coverage data in the runner's directory. `Ok(None)` means
/// there is nothing to report on.
pub async fn collect(runner: &dyn CommandRunner) -> Result<Option<CoverageData>> {
    let root = runner.working_dir().to_path_buf();
    let formats = detect(&root);

    if formats.is_empty() {
        if PYTHON_PROJECT_MARKERS.iter().any(|m| root.join(m).exists()) {
            export_python(runner).await;
            return load_python(&root);
        }
        return Ok(None);
    }

    for format in formats {
        info!(tool = format.tool(), "Coverage data detected");
        let data = match format {
            CoverageFormat::Python => {
                if root.join(PYTHON_DATA).exists() {
                    export_python(runner).await;
                }
                load_python(&root)?
            }
            CoverageFormat::JavaScript => load_istanbul(&root)?,
        };
        if data.is_some() {
            return Ok(data);
        }
    }
    Ok(None)
}

fn coverage_bar(pct: f64, width: usize) -> String {
    format!("{} {pct:.1}%", gauge(pct, 100.0, width))
}

fn no_data(report: &mut Report) {
    let mut help = ReportSection::new("⚠️  No coverage data found");
    help.line("Run the tests with coverage enabled first:");
    help.blank();
    help.line("Python:");
    help.line("  pip install coverage");
    help.line("  coverage run -m pytest");
    help.line("  coverage json");
    help.blank();
    help.line("JavaScript/TypeScript (jest):");
    help.line("  npm test -- --coverage --coverageReporters=json");
    help.blank();
    help.line("JavaScript/TypeScript (vitest):");
    help.line("  npx vitest run --coverage");
    report.push(help);
}

pub fn render(data: Option<&CoverageData>, generated_at: Option<NaiveDateTime>) -> Report {
    let mut report = Report::new("📊 Test Coverage Analysis")
        .with_width(WIDTH)
        .with_timestamp(generated_at);

    let Some(data) = data else {
        no_data(&mut report);
        return report;
    };
    report
        .meta("Tool", data.format.tool())
        .meta("Source", &data.source);

    let overall = data.overall();
    let level = Level::from_percent(overall);
    let total = data.total_statements();
    let covered = data.covered_statements();

    let mut summary = ReportSection::new("📈 Summary");
    summary.line(format!(
        "Overall coverage:  {} {} {}",
        coverage_bar(overall, 20),
        level.as_str(),
        level.icon()
    ));
    if let Some(branch) = data.branch_coverage() {
        summary.line(format!("Branch coverage:   {}", coverage_bar(branch, 20)));
    }
    summary.line(format!("Statements:        {total}"));
    summary.line(format!("Covered:           {covered}"));
    summary.line(format!("Not covered:       {}", total - covered));
    report.push(summary);

    let distribution = data.distribution();
    let mut dist = ReportSection::new("📊 Distribution");
    for level in Level::ALL {
        if let Some(count) = distribution.get(&level) {
            dist.line(format!("{} {}: {count} files", level.icon(), level.as_str()));
        }
    }
    report.push(dist);

    let zero = data.zero_coverage();
    if !zero.is_empty() {
        let mut section = ReportSection::new("🔴 Files Without Coverage");
        for file in zero.iter().take(20) {
            section.line(format!("  • {}", file.path));
        }
        if zero.len() > 20 {
            section.line(format!("  ... and {} more files", zero.len() - 20));
        }
        report.push(section);
    }

    let low = data.low_coverage();
    if !low.is_empty() {
        let mut section = ReportSection::new("🟠 Low Coverage (< 50%)");
        for file in low.iter().take(20) {
            section.line(format!("  {} {}", coverage_bar(file.coverage(), 15), file.path));
        }
        if low.len() > 20 {
            section.line(format!("  ... and {} more files", low.len() - 20));
        }
        report.push(section);
    }

    let mut table = ReportSection::new("📁 Files");
    let mut files: Vec<&FileCoverage> = data.files.iter().collect();
    files.sort_by(|a, b| b.coverage().total_cmp(&a.coverage()));
    for file in files {
        table.line(format!(
            "{} {} {}",
            coverage_bar(file.coverage(), 30),
            file.level().icon(),
            file.path
        ));
    }
    report.push(table);

    let count = |level: Level| distribution.get(&level).copied().unwrap_or(0);
    let mut advice = ReportSection::new("💡 Recommendations");
    if count(Level::Critical) > 0 {
        advice.line(format!(
            "🔴 Urgent: {} files below 25% need tests now",
            count(Level::Critical)
        ));
    }
    if count(Level::Poor) > 0 {
        advice.line(format!(
            "🟠 Important: {} files between 25% and 50%",
            count(Level::Poor)
        ));
    }
    if count(Level::Fair) > 0 {
        advice.line(format!(
            "🟡 Suggested: {} files between 50% and 75% could improve",
            count(Level::Fair)
        ));
    }
    if !zero.is_empty() {
        advice.line(format!("⚠️  {} files have no test coverage at all", zero.len()));
    }
    let priorities = data.priorities();
    if !priorities.is_empty() {
        advice.blank();
        advice.line("🎯 Test these first:");
        for (i, file) in priorities.iter().enumerate() {
            advice.line(format!("  {}. {}", i + 1, file.path));
            advice.line(format!(
                "     now {:.1}%, target 75%+, {} statements to cover",
                file.coverage(),
                file.missing
            ));
        }
    }
    report.push(advice);

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::ScriptedRunner;
    use tempfile::TempDir;

    const PYTHON_JSON_SAMPLE: &str = r#"{
      "meta": {"version": "7.4.0"},
      "files": {
        "app/core.py": {"summary": {"num_statements": 100, "covered_lines": 95, "missing_lines": 5,
                                    "num_branches": 10, "covered_branches": 8}},
        "app/util.py": {"summary": {"num_statements": 40, "covered_lines": 10, "missing_lines": 30}},
        "app/cli.py": {"summary": {"num_statements": 20, "covered_lines": 0, "missing_lines": 20}}
      },
      "totals": {"percent_covered": 65.6}
    }"#;

    const ISTANBUL_SAMPLE: &str = r#"{
      "/src/a.js": {
        "path": "/src/a.js",
        "s": {"0": 5, "1": 0, "2": 12, "3": 1},
        "b": {"0": [1, 0], "1": [3, 3]},
        "f": {"0": 2, "1": 0}
      },
      "/src/b.js": {"s": {"0": 0, "1": 0}, "b": {}, "f": {}},
      "total": 7
    }"#;

    #[test]
    fn test_parse_python() {
        let files = parse_python(PYTHON_JSON_SAMPLE).unwrap();
        assert_eq!(files.len(), 3);
        let core = files.iter().find(|f| f.path == "app/core.py").unwrap();
        assert_eq!(core.coverage(), 95.0);
        assert_eq!(core.branch_coverage(), Some(80.0));
        assert_eq!(core.level(), Level::Excellent);

        assert!(parse_python(ISTANBUL_SAMPLE).is_err());
    }

    #[test]
    fn test_parse_istanbul_counts_statements() {
        let files = parse_istanbul(ISTANBUL_SAMPLE).unwrap();
        assert_eq!(files.len(), 2);
        let a = &files[0];
        assert_eq!(a.statements, 4);
        assert_eq!(a.covered, 3);
        assert_eq!(a.missing, 1);
        assert_eq!(a.branches, 4);
        assert_eq!(a.covered_branches, 3);
        assert_eq!(a.functions, Some(2));
        assert_eq!(files[1].coverage(), 0.0);
    }

    #[test]
    fn test_levels() {
        assert_eq!(Level::from_percent(90.0), Level::Excellent);
        assert_eq!(Level::from_percent(75.0), Level::Good);
        assert_eq!(Level::from_percent(50.0), Level::Fair);
        assert_eq!(Level::from_percent(25.0), Level::Poor);
        assert_eq!(Level::from_percent(24.9), Level::Critical);
    }

    #[test]
    fn test_aggregates() {
        let data = CoverageData {
            format: CoverageFormat::Python,
            source: PYTHON_JSON.to_string(),
            files: parse_python(PYTHON_JSON_SAMPLE).unwrap(),
        };
        assert_eq!(data.total_statements(), 160);
        assert_eq!(data.covered_statements(), 105);
        assert_eq!(data.branch_coverage(), Some(80.0));
        assert_eq!(data.zero_coverage().len(), 1);
        assert_eq!(data.low_coverage()[0].path, "app/util.py");
        assert_eq!(data.priorities().len(), 1);

        let text = render(Some(&data), None).render();
        assert!(text.contains("Overall coverage:  [█████████████░░░░░░░] 65.6% Fair 🟡"));
        assert!(text.contains("• app/cli.py"));
        assert!(text.contains("1. app/util.py"));
        assert!(text.contains("🔴 Urgent: 1 files below 25%"));
    }

    #[test]
    fn test_render_without_data() {
        let text = render(None, None).render();
        assert!(text.contains("No coverage data found"));
        assert!(text.contains("coverage run -m pytest"));
    }

    #[tokio::test]
    async fn test_collect_prefers_istanbul_when_python_json_is_foreign() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("coverage.json"), ISTANBUL_SAMPLE).unwrap();
        let runner = ScriptedRunner::in_dir(dir.path());

        let data = collect(&runner).await.unwrap().unwrap();
        assert_eq!(data.format, CoverageFormat::JavaScript);
        assert_eq!(data.source, "coverage.json");
        assert!(!runner.called("coverage json"));
    }

    #[tokio::test]
    async fn test_collect_exports_dot_coverage() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".coverage"), "sqlite").unwrap();
        std::fs::write(dir.path().join("coverage.json"), PYTHON_JSON_SAMPLE).unwrap();
        let runner = ScriptedRunner::in_dir(dir.path()).missing("coverage");

        let data = collect(&runner).await.unwrap().unwrap();
        assert_eq!(data.format, CoverageFormat::Python);
        assert!(runner.called("coverage json"));
    }

    #[tokio::test]
    async fn test_collect_without_data() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::in_dir(dir.path());
        assert!(collect(&runner).await.unwrap().is_none());
        assert!(runner.calls.lock().unwrap().is_empty());
    }
}
