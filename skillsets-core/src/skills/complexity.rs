//! Cyclomatic complexity map built from `radon` (Python) or `lizard`
//! (multi-language) output.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::ReportSection;
use crate::report::Report;
use crate::runner::CommandRunner;

pub const REPORT_FILE: &str = "complexity_map_report.txt";

const TOOL_TIMEOUT: Duration = Duration::from_secs(60);

static RADON_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+([FMC])\s+(\d+):\d+\s+(\S+)\s+-\s+[A-F]\s+\((\d+)\)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Radon,
    Lizard,
}

impl Tool {
    pub fn as_str(&self) -> &str {
        match self {
            Tool::Radon => "radon",
            Tool::Lizard => "lizard",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionComplexity {
    pub file: String,
    pub name: String,
    pub line: Option<u32>,
    pub complexity: u32,
}

impl FunctionComplexity {
    pub fn display_name(&self) -> String {
        format!("{}:{}", self.file, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_complexity(cc: f64) -> Self {
        if cc < 15.0 {
            RiskLevel::Low
        } else if cc < 25.0 {
            RiskLevel::Medium
        } else if cc < 50.0 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }

    pub fn emoji(&self) -> &str {
        match self {
            RiskLevel::Low => "🟢",
            RiskLevel::Medium => "🟡",
            RiskLevel::High => "🟠",
            RiskLevel::Critical => "🔴",
        }
    }

    fn range(&self) -> &str {
        match self {
            RiskLevel::Low => "CC < 15",
            RiskLevel::Medium => "CC 15-25",
            RiskLevel::High => "CC 25-50",
            RiskLevel::Critical => "CC ≥ 50",
        }
    }
}

/// Parses `radon cc -j`: a map from file to a list of blocks, where classes
/// carry their methods. Files radon failed on map to `{"error": ...}` and are skipped.
pub fn parse_radon_json(text: &str) -> Result<Vec<FunctionComplexity>> {
    let data: Value = serde_json::from_str(text)?;
    let files = data
        .as_object()
        .ok_or_else(|| Error::Parse("radon output is not a JSON object".into()))?;

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for (file, blocks) in files {
        let Some(blocks) = blocks.as_array() else {
            continue;
        };
        collect_radon_blocks(file, blocks, &mut out, &mut seen);
    }
    Ok(out)
}

fn collect_radon_blocks(
    file: &str,
    blocks: &[Value],
    out: &mut Vec<FunctionComplexity>,
    seen: &mut HashSet<(String, String, Option<u32>)>,
) {
    for block in blocks {
        let kind = block.get("type").and_then(Value::as_str).unwrap_or("");
        if kind == "class" {
            if let Some(methods) = block.get("methods").and_then(Value::as_array) {
                collect_radon_blocks(file, methods, out, seen);
            }
            continue;
        }

        let Some(name) = block.get("name").and_then(Value::as_str) else {
            continue;
        };
        let Some(complexity) = block.get("complexity").and_then(Value::as_u64) else {
            continue;
        };
        let name = match block.get("classname").and_then(Value::as_str) {
            Some(class) if !class.is_empty() => format!("{class}.{name}"),
            _ => name.to_string(),
        };
        let line = block
            .get("lineno")
            .and_then(Value::as_u64)
            .map(|l| l as u32);

        if seen.insert((file.to_string(), name.clone(), line)) {
            out.push(FunctionComplexity {
                file: file.to_string(),
                name,
                line,
                complexity: complexity as u32,
            });
        }
    }
}

/// Parses plain `radon cc -s` output: a file name line followed by indented
/// `F 12:0 name - B (7)` blocks. Class rows are skipped.
pub fn parse_radon_text(text: &str) -> Vec<FunctionComplexity> {
    let mut out = Vec::new();
    let mut file = String::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            file = line.trim().to_string();
            continue;
        }
        let Some(caps) = RADON_TEXT_RE.captures(line) else {
            continue;
        };
        if &caps[1] == "C" {
            continue;
        }
        let (Ok(line_no), Ok(cc)) = (caps[2].parse::<u32>(), caps[4].parse::<u32>()) else {
            continue;
        };
        out.push(FunctionComplexity {
            file: file.clone(),
            name: caps[3].to_string(),
            line: Some(line_no),
            complexity: cc,
        });
    }

    out
}

/// Parses lizard's function table: `NLOC CCN token PARAM length location`
/// with `location` shaped as `name@start-end@file`. The warnings section
/// repeats rows, so locations are deduplicated.
pub fn parse_lizard(text: &str) -> Vec<FunctionComplexity> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    for line in text.lines() {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < 6 {
            continue;
        }
        let Ok(cc) = cols[1].parse::<u32>() else {
            continue;
        };
        if cols[..5].iter().any(|c| c.parse::<u64>().is_err()) {
            continue;
        }
        let location = cols[5..].join(" ");
        let mut parts = location.splitn(3, '@');
        let (Some(name), Some(span), Some(file)) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        if !seen.insert(location.clone()) {
            continue;
        }
        let line_no = span.split('-').next().and_then(|s| s.parse().ok());
        out.push(FunctionComplexity {
            file: file.trim_start_matches("./").to_string(),
            name: name.to_string(),
            line: line_no,
            complexity: cc,
        });
    }

    out
}

#[derive(Debug, Clone)]
pub struct ComplexityData {
    pub tool: Tool,
    pub functions: Vec<FunctionComplexity>,
}

pub fn is_python_project(dir: &Path) -> bool {
    ["setup.py", "pyproject.toml", "pytest.ini"]
        .iter()
        .any(|f| dir.join(f).exists())
}

async fn run_radon(runner: &dyn CommandRunner) -> Result<Option<Vec<FunctionComplexity>>> {
    let json = match runner
        .run_with_timeout("radon", &["cc", ".", "-a", "-s", "-j"], TOOL_TIMEOUT)
        .await
    {
        Err(Error::ToolNotFound(_)) => return Ok(None),
        other => other?,
    };

    if json.success {
        match parse_radon_json(&json.stdout) {
            Ok(functions) => return Ok(Some(functions)),
            Err(e) => warn!(error = %e, "Unreadable radon JSON, retrying with text output"),
        }
    }

    let text = runner
        .run_with_timeout("radon", &["cc", ".", "-a", "-s"], TOOL_TIMEOUT)
        .await?;
    Ok(Some(parse_radon_text(&text.stdout)))
}

async fn run_lizard(
    runner: &dyn CommandRunner,
    ccn: u32,
) -> Result<Option<Vec<FunctionComplexity>>> {
    let ccn = ccn.to_string();
    // lizard exits non-zero when any function exceeds the threshold.
    match runner
        .run_with_timeout("lizard", &[".", "--CCN", ccn.as_str()], TOOL_TIMEOUT)
        .await
    {
        Err(Error::ToolNotFound(_)) => Ok(None),
        Err(e) => Err(e),
        Ok(output) => Ok(Some(parse_lizard(&output.stdout))),
    }
}

/// Runs radon for Python projects and lizard otherwise or as a fallback.
/// `None` means neither tool is installed or found anything to analyze.
pub async fn fetch(runner: &dyn CommandRunner, ccn: u32) -> Result<Option<ComplexityData>> {
    if is_python_project(runner.working_dir()) {
        info!("Python project detected, trying radon");
        if let Some(functions) = run_radon(runner).await? {
            if !functions.is_empty() {
                return Ok(Some(ComplexityData {
                    tool: Tool::Radon,
                    functions,
                }));
            }
        }
    }

    match run_lizard(runner, ccn).await? {
        Some(functions) if !functions.is_empty() => Ok(Some(ComplexityData {
            tool: Tool::Lizard,
            functions,
        })),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone)]
pub struct ComplexityAnalysis {
    pub tool: Tool,
    /// Most complex first.
    pub functions: Vec<FunctionComplexity>,
    pub average: f64,
    pub max: u32,
    /// Per-file average complexity, highest first.
    pub file_averages: Vec<(String, f64)>,
}

impl ComplexityAnalysis {
    pub fn at_level(&self, level: RiskLevel) -> Vec<&FunctionComplexity> {
        self.functions
            .iter()
            .filter(|f| RiskLevel::from_complexity(f.complexity as f64) == level)
            .collect()
    }

    /// Critical then high-risk functions, most complex first.
    pub fn refactor_priorities(&self) -> Vec<&FunctionComplexity> {
        self.functions
            .iter()
            .filter(|f| RiskLevel::from_complexity(f.complexity as f64) >= RiskLevel::High)
            .collect()
    }
}

pub fn analyze(data: &ComplexityData) -> ComplexityAnalysis {
    let mut functions = data.functions.clone();
    functions.sort_by(|a, b| {
        b.complexity
            .cmp(&a.complexity)
            .then_with(|| a.display_name().cmp(&b.display_name()))
    });

    let total: u64 = functions.iter().map(|f| f.complexity as u64).sum();
    let average = if functions.is_empty() {
        0.0
    } else {
        total as f64 / functions.len() as f64
    };
    let max = functions.first().map(|f| f.complexity).unwrap_or(0);

    let mut per_file: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    for f in &functions {
        per_file.entry(f.file.clone()).or_default().push(f.complexity);
    }
    let mut file_averages: Vec<(String, f64)> = per_file
        .into_iter()
        .map(|(file, ccs)| {
            let avg = ccs.iter().map(|c| *c as f64).sum::<f64>() / ccs.len() as f64;
            (file, avg)
        })
        .collect();
    file_averages.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    ComplexityAnalysis {
        tool: data.tool,
        functions,
        average,
        max,
        file_averages,
    }
}

/// `[████░░░░] 12`; full at complexity 50.
pub fn complexity_bar(cc: f64, width: usize) -> String {
    let filled = if cc >= 50.0 {
        width
    } else {
        ((cc / 50.0 * width as f64) as usize).min(width)
    };
    let value = if cc.fract() == 0.0 {
        format!("{cc:.0}")
    } else {
        format!("{cc:.1}")
    };
    format!("[{}{}] {value}", "█".repeat(filled), "░".repeat(width - filled))
}

pub fn render(analysis: Option<&ComplexityAnalysis>, generated_at: Option<NaiveDateTime>) -> Report {
    let mut report = Report::new("📊 Code Complexity Analysis")
        .with_width(80)
        .with_timestamp(generated_at);

    let Some(analysis) = analysis else {
        let mut missing = ReportSection::new("⚠️  No Analysis Data");
        missing.line("No analyzable code was found, or no analysis tool is installed.");
        missing.blank();
        missing.line("Python projects (radon recommended):");
        missing.line("  pip install radon");
        missing.blank();
        missing.line("Multi-language projects (lizard recommended):");
        missing.line("  pip install lizard");
        missing.blank();
        missing.line("Then run the analysis again.");
        report.push(missing);
        return report;
    };

    report.meta("Tool", analysis.tool.as_str().to_uppercase());

    let mut overall = ReportSection::new("📈 Overview");
    overall.line(format!("Functions analyzed: {}", analysis.functions.len()));
    overall.line(format!("Average complexity: {:.2}", analysis.average));
    overall.line(format!("Highest complexity: {}", analysis.max));
    report.push(overall);

    let mut distribution = ReportSection::new("🎯 Risk Distribution");
    for level in [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ] {
        let count = analysis.at_level(level).len();
        if count > 0 {
            distribution.line(format!(
                "{} {} ({}): {count} functions",
                level.emoji(),
                level.as_str(),
                level.range()
            ));
        }
    }
    report.push(distribution);

    for (level, limit, width) in [(RiskLevel::Critical, 10, 20), (RiskLevel::High, 15, 15)] {
        let funcs = analysis.at_level(level);
        if funcs.is_empty() {
            continue;
        }
        let mut section = ReportSection::new(format!(
            "{} {} Risk Functions ({})",
            level.emoji(),
            level.as_str(),
            level.range()
        ));
        for f in funcs.iter().take(limit) {
            section.line(format!(
                "  {} {}",
                complexity_bar(f.complexity as f64, width),
                f.display_name()
            ));
        }
        if funcs.len() > limit {
            section.line(format!("  ... and {} more", funcs.len() - limit));
        }
        report.push(section);
    }

    let mut top = ReportSection::new("🔝 Top 20 Most Complex Functions");
    for (i, f) in analysis.functions.iter().take(20).enumerate() {
        let level = RiskLevel::from_complexity(f.complexity as f64);
        top.line(format!(
            "{:2}. {} {}",
            i + 1,
            complexity_bar(f.complexity as f64, 20),
            level.emoji()
        ));
        top.line(format!("     {}", f.display_name()));
    }
    report.push(top);

    let mut files = ReportSection::new("📁 Files by Average Complexity");
    for (i, (file, avg)) in analysis.file_averages.iter().take(20).enumerate() {
        let level = RiskLevel::from_complexity(*avg);
        files.line(format!(
            "{:2}. {} {} {file}",
            i + 1,
            complexity_bar(*avg, 15),
            level.emoji()
        ));
    }
    report.push(files);

    let critical = analysis.at_level(RiskLevel::Critical).len();
    let high = analysis.at_level(RiskLevel::High).len();
    let medium = analysis.at_level(RiskLevel::Medium).len();

    let mut advice = ReportSection::new("💡 Recommendations");
    if critical > 0 {
        advice.line(format!(
            "🔴 Urgent: {critical} functions exceed complexity 50 and must be refactored"
        ));
    }
    if high > 0 {
        advice.line(format!("🟠 Important: {high} functions between 25 and 50"));
    }
    if medium > 0 {
        advice.line(format!("🟡 Suggested: {medium} functions between 15 and 25"));
    }
    if analysis.average > 20.0 {
        advice.blank();
        advice.line("⚠️  Average complexity is high; consider a broader refactor");
    }
    advice.blank();
    advice.line("🎯 Refactoring priorities:");
    let priorities = analysis.refactor_priorities();
    if priorities.is_empty() {
        advice.line("  ✅ Complexity is within an acceptable range");
    } else {
        for (i, f) in priorities.iter().take(5).enumerate() {
            advice.line(format!("  {}. {}", i + 1, f.display_name()));
            advice.line(format!("     Current complexity: {}, target: < 15", f.complexity));
        }
    }
    report.push(advice);

    report
}
