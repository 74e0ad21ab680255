//! Heuristic code-smell detection for Python and JavaScript/TypeScript sources.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::ReportSection;
use crate::paths;
use crate::pysource;
use crate::report::Report;

pub const REPORT_FILE: &str = "code_smell_report.txt";

const SKIP_DIRS: &[&str] = &[".git", "node_modules", "venv", ".venv", "__pycache__"];

const MAX_COMPLEXITY: usize = 15;
const MAX_FUNCTION_LINES: usize = 50;
const MAX_PARAMS: usize = 5;
const MAX_NESTING: usize = 4;
const MAX_MAGIC_NUMBERS: usize = 20;
const MAX_NESTING_REPORTS: usize = 10;
const MAX_CONSOLE_REPORTS: usize = 15;
const MAX_VAR_REPORTS: usize = 20;
const MAX_DETAILS: usize = 100;

static SNAKE_CASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap());
static PASCAL_CASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9]*$").unwrap());
static MAGIC_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([3-9]|[1-9]\d+)\b").unwrap());
static JS_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:function\s+(\w+)|(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s*)?\([^)]*\)\s*=>)")
        .unwrap()
});
static JS_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bvar\s+\w+").unwrap());

/// Words that make a number on the line self-explanatory.
const NUMBER_CONTEXT: &[&str] = &["range", "sleep", "timeout", "port", "size", "length"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    pub fn icon(&self) -> &str {
        match self {
            Severity::Critical => "🔴",
            Severity::High => "🟠",
            Severity::Medium => "🟡",
            Severity::Low => "🟢",
        }
    }

    fn penalty(&self) -> u32 {
        match self {
            Severity::Critical => 10,
            Severity::High => 5,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Complexity,
    Duplication,
    Naming,
    Design,
    DeadCode,
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Complexity => "complexity",
            Category::Duplication => "duplication",
            Category::Naming => "naming",
            Category::Design => "design",
            Category::DeadCode => "dead_code",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSmell {
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub suggestion: String,
}

impl CodeSmell {
    fn new(
        severity: Severity,
        category: Category,
        file: &str,
        line: usize,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            file: file.to_string(),
            line,
            suggestion: suggestion.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmellScan {
    pub root: PathBuf,
    /// Python and JavaScript/TypeScript files that were inspected.
    pub files_analyzed: usize,
    /// Every source file seen, Go included.
    pub total_files: usize,
    pub smells: Vec<CodeSmell>,
}

impl SmellScan {
    pub fn score(&self) -> u32 {
        quality_score(&self.smells)
    }

    pub fn by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.smells {
            *counts.entry(s.severity).or_default() += 1;
        }
        counts
    }

    pub fn by_category(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.smells {
            *counts.entry(s.category).or_default() += 1;
        }
        counts
    }
}

pub fn analyze_python(file: &str, source: &str) -> Vec<CodeSmell> {
    let module = pysource::parse(source);
    let mut smells = Vec::new();

    for func in module.functions() {
        let complexity = module.complexity(func);
        if complexity > MAX_COMPLEXITY {
            smells.push(CodeSmell::new(
                Severity::High,
                Category::Complexity,
                file,
                func.line,
                format!(
                    "Function '{}' is too complex (complexity: {complexity})",
                    func.name
                ),
                "Split the function into smaller functions",
            ));
        }

        let length = func.length();
        if length > MAX_FUNCTION_LINES {
            smells.push(CodeSmell::new(
                Severity::Medium,
                Category::Design,
                file,
                func.line,
                format!("Function '{}' is too long ({length} lines)", func.name),
                format!("Keep functions under {MAX_FUNCTION_LINES} lines"),
            ));
        }

        if func.params.len() > MAX_PARAMS {
            smells.push(CodeSmell::new(
                Severity::Medium,
                Category::Design,
                file,
                func.line,
                format!(
                    "Function '{}' has too many parameters ({})",
                    func.name,
                    func.params.len()
                ),
                "Group parameters into a data class or dictionary",
            ));
        }

        let depth = module.nesting_depth(func);
        if depth > MAX_NESTING {
            smells.push(CodeSmell::new(
                Severity::Medium,
                Category::Complexity,
                file,
                func.line,
                format!("Function '{}' is nested too deeply ({depth} levels)", func.name),
                "Use early returns or extract helper functions",
            ));
        }

        if !func.is_async && !SNAKE_CASE.is_match(&func.name) {
            smells.push(CodeSmell::new(
                Severity::Low,
                Category::Naming,
                file,
                func.line,
                format!("Function '{}' does not follow snake_case", func.name),
                "Use snake_case for function names",
            ));
        }
    }

    for class in module.classes() {
        if !PASCAL_CASE.is_match(&class.name) {
            smells.push(CodeSmell::new(
                Severity::Low,
                Category::Naming,
                file,
                class.line,
                format!("Class '{}' does not follow PascalCase", class.name),
                "Use PascalCase for class names",
            ));
        }
    }

    let mut magic = 0;
    for (i, line) in source.lines().enumerate() {
        if magic >= MAX_MAGIC_NUMBERS {
            break;
        }
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            continue;
        }
        let lower = line.to_lowercase();
        if NUMBER_CONTEXT.iter().any(|w| lower.contains(w)) {
            continue;
        }
        if let Some(m) = MAGIC_NUMBER.captures(line) {
            smells.push(CodeSmell::new(
                Severity::Low,
                Category::Naming,
                file,
                i + 1,
                format!("Magic number: {}", &m[1]),
                "Replace with a named constant",
            ));
            magic += 1;
        }
    }

    smells
}

pub fn analyze_javascript(file: &str, source: &str) -> Vec<CodeSmell> {
    let mut smells = Vec::new();

    let starts: Vec<(usize, String)> = JS_FUNCTION
        .captures_iter(source)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let name = caps.get(1).or_else(|| caps.get(2))?.as_str().to_string();
            Some((start, name))
        })
        .collect();

    for (i, (start, name)) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map(|(s, _)| *s).unwrap_or(source.len());
        let length = source[*start..end].matches('\n').count();
        if length > MAX_FUNCTION_LINES {
            let line = source[..*start].matches('\n').count() + 1;
            smells.push(CodeSmell::new(
                Severity::Medium,
                Category::Design,
                file,
                line,
                format!("Function '{name}' is too long (~{length} lines)"),
                "Split the function into smaller functions",
            ));
        }
    }

    let lines: Vec<&str> = source.lines().collect();
    let mut nesting = 0;
    for (i, line) in lines.iter().enumerate() {
        if nesting >= MAX_NESTING_REPORTS {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        let previous = if i > 0 {
            lines[i - 1].len() - lines[i - 1].trim_start().len()
        } else {
            0
        };
        let per_level = if previous < 4 { 2 } else { 4 };
        let depth = indent / per_level;
        if depth > MAX_NESTING {
            smells.push(CodeSmell::new(
                Severity::Medium,
                Category::Complexity,
                file,
                i + 1,
                format!("Deep nesting ({depth} levels)"),
                "Use early returns or extract helper functions",
            ));
            nesting += 1;
        }
    }

    let mut consoles = 0;
    for (i, line) in lines.iter().enumerate() {
        if consoles >= MAX_CONSOLE_REPORTS {
            break;
        }
        if line.contains("console.log") && !line.trim_start().starts_with("//") {
            smells.push(CodeSmell::new(
                Severity::Low,
                Category::DeadCode,
                file,
                i + 1,
                "Leftover console.log",
                "Remove it or use a proper logging library",
            ));
            consoles += 1;
        }
    }

    for (i, _) in lines
        .iter()
        .enumerate()
        .filter(|(_, l)| JS_VAR.is_match(l))
        .take(MAX_VAR_REPORTS)
    {
        smells.push(CodeSmell::new(
            Severity::Low,
            Category::Naming,
            file,
            i + 1,
            "Use of 'var'",
            "Use 'const' or 'let' instead",
        ));
    }

    smells
}

/// 100 minus 10/5/2/1 points per critical/high/medium/low smell, floored at 0.
pub fn quality_score(smells: &[CodeSmell]) -> u32 {
    let penalty: u32 = smells.iter().map(|s| s.severity.penalty()).sum();
    100u32.saturating_sub(penalty)
}

pub fn rating(score: u32) -> &'static str {
    match score {
        90.. => "🟢 Excellent",
        75..=89 => "🟡 Good",
        60..=74 => "🟠 Fair",
        _ => "🔴 Poor",
    }
}

/// Walks `root` and inspects every Python, JavaScript and TypeScript file.
/// Fails with [`Error::NoData`] when no supported source file exists.
pub fn scan(root: &Path) -> Result<SmellScan> {
    let files = paths::source_files(root, &["py", "js", "ts", "go"], SKIP_DIRS);
    if files.is_empty() {
        return Err(Error::NoData(format!(
            "no Python, JavaScript, TypeScript or Go files under {}",
            root.display()
        )));
    }

    let mut smells = Vec::new();
    let mut files_analyzed = 0;

    for path in &files {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if ext == "go" {
            continue;
        }
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "Skipping unreadable file");
                continue;
            }
        };
        let rel = paths::relative(root, path);
        files_analyzed += 1;
        match ext {
            "py" => smells.extend(analyze_python(&rel, &source)),
            _ => smells.extend(analyze_javascript(&rel, &source)),
        }
    }

    tracing::info!(files = files_analyzed, smells = smells.len(), "Code smell scan finished");

    Ok(SmellScan {
        root: root.to_path_buf(),
        files_analyzed,
        total_files: files.len(),
        smells,
    })
}

pub fn render(scan: &SmellScan, generated_at: Option<NaiveDateTime>) -> Report {
    let score = scan.score();
    let by_severity = scan.by_severity();
    let by_category = scan.by_category();

    let mut report = Report::new("Code Smell Report").with_timestamp(generated_at);
    report
        .meta("Project", scan.root.display())
        .meta("Quality score", format!("{score}/100 ({})", rating(score)))
        .meta("Files analyzed", scan.files_analyzed)
        .meta("Issues found", scan.smells.len());

    let mut severity = ReportSection::new("📊 Issues by Severity");
    for level in Severity::ALL {
        severity.line(format!(
            "{} {}: {}",
            level.icon(),
            level.as_str().to_uppercase(),
            by_severity.get(&level).copied().unwrap_or(0)
        ));
    }
    report.push(severity);

    if !by_category.is_empty() {
        let mut categories = ReportSection::new("📁 Issues by Category");
        let mut ranked: Vec<(&Category, &usize)> = by_category.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (category, count) in ranked {
            categories.line(format!("{}: {count}", category.as_str()));
        }
        report.push(categories);
    }

    if !scan.smells.is_empty() {
        let mut sorted: Vec<&CodeSmell> = scan.smells.iter().collect();
        sorted.sort_by_key(|s| s.severity);

        let mut details = ReportSection::new("🔍 Issue Details");
        for smell in sorted.iter().take(MAX_DETAILS) {
            details.line(format!(
                "{} [{}] {}:{}",
                smell.severity.icon(),
                smell.severity.as_str().to_uppercase(),
                smell.file,
                smell.line
            ));
            details.line(format!("   {}", smell.message));
            details.line(format!("   💡 {}", smell.suggestion));
            details.blank();
        }
        if sorted.len() > MAX_DETAILS {
            details.line(format!("... and {} more issues", sorted.len() - MAX_DETAILS));
        }
        report.push(details);
    }

    let mut tips = Vec::new();
    tips.push(match score {
        0..=59 => "🚨 Code quality needs urgent attention; start with the critical and high issues",
        60..=74 => "⚠️  Code quality needs work; schedule time for cleanup",
        75..=89 => "💡 Code quality is reasonable; keep improving the remaining issues",
        _ => "✅ Code quality is excellent; keep it up",
    }
    .to_string());
    if let Some(n) = by_severity.get(&Severity::Critical) {
        tips.push(format!("Fix the {n} critical issues first"));
    }
    if let Some(n) = by_severity.get(&Severity::High) {
        tips.push(format!("Address the {n} high-severity issues"));
    }
    if by_category.get(&Category::Complexity).is_some_and(|&n| n > 5) {
        tips.push("Many complexity issues; consider a focused refactoring pass".to_string());
    }
    tips.push("Run linters (pylint, eslint) in CI".to_string());
    tips.push("Make smell checks part of code review".to_string());
    tips.push("Use refactoring tools to reduce complexity".to_string());

    let mut recommendations = ReportSection::new("💡 Recommendations");
    for (i, tip) in tips.iter().enumerate() {
        recommendations.line(format!("{}. {tip}", i + 1));
    }
    report.push(recommendations);

    report
}
