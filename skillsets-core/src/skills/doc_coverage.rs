//! Documentation coverage for Python and JavaScript/TypeScript sources:
//! which modules, classes and functions carry docs, and how good those are.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::ReportSection;
use crate::paths;
use crate::pysource;
use crate::report::{pad, truncate_end, Report};

pub const REPORT_FILE: &str = "doc_coverage_report.txt";
pub const JSON_FILE: &str = "doc_coverage_report.json";

const WIDTH: usize = 120;

pub const SKIP_DIRS: &[&str] = &[
    "node_modules",
    "venv",
    ".venv",
    "env",
    "__pycache__",
    ".git",
    "dist",
    "build",
    "tests",
    "test",
    ".tox",
    ".pytest_cache",
    "vendor",
    "third_party",
    ".next",
    ".nuxt",
];

static JS_FUNCTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"function\s+(\w+)\s*\(",
        r"const\s+(\w+)\s*=\s*(?:async\s*)?\([^)]*\)\s*=>",
        r"(\w+)\s*:\s*(?:async\s*)?function",
        r"(\w+)\s*\([^)]*\)\s*\{",
        r"export\s+(?:const|function)\s+(\w+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Control-flow keywords that the method pattern would otherwise pick up.
const JS_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch", "function", "return"];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocQuality {
    Complete,
    Good,
    Basic,
    Poor,
    Missing,
}

impl DocQuality {
    pub const ALL: [DocQuality; 5] = [
        DocQuality::Complete,
        DocQuality::Good,
        DocQuality::Basic,
        DocQuality::Poor,
        DocQuality::Missing,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            DocQuality::Complete => "complete",
            DocQuality::Good => "good",
            DocQuality::Basic => "basic",
            DocQuality::Poor => "poor",
            DocQuality::Missing => "missing",
        }
    }

    fn weight(&self) -> f64 {
        match self {
            DocQuality::Complete => 100.0,
            DocQuality::Good => 80.0,
            DocQuality::Basic => 50.0,
            DocQuality::Poor => 20.0,
            DocQuality::Missing => 0.0,
        }
    }
}

/// Grades a docstring by length and whether it mentions arguments and return values.
pub fn assess_quality(doc: Option<&str>) -> DocQuality {
    let Some(doc) = doc else {
        return DocQuality::Missing;
    };
    let clean = WHITESPACE.replace_all(doc.trim(), " ");
    let lower = clean.to_lowercase();

    if clean.chars().count() < 10 || ["todo", "fix me", "tbd", "placeholder"].contains(&lower.as_str())
    {
        return DocQuality::Poor;
    }

    let described = clean.chars().count() > 20;
    let has_args = lower.contains("arg") || lower.contains("param");
    let has_return = lower.contains("return");

    match (described, has_args && has_return) {
        (true, true) => DocQuality::Complete,
        (true, false) => DocQuality::Good,
        _ => DocQuality::Basic,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDoc {
    pub name: String,
    pub line: usize,
    pub is_public: bool,
    pub is_method: bool,
    pub has_doc: bool,
    pub doc_quality: DocQuality,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassDoc {
    pub name: String,
    pub line: usize,
    pub is_public: bool,
    pub has_doc: bool,
    pub doc_quality: DocQuality,
    pub methods: Vec<FunctionDoc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleDoc {
    pub has_doc: bool,
    pub quality: DocQuality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Python,
    Javascript,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileDoc {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_doc: Option<ModuleDoc>,
    pub classes: Vec<ClassDoc>,
    pub functions: Vec<FunctionDoc>,
    pub total_elements: usize,
    pub documented_elements: usize,
    pub coverage: f64,
}

impl FileDoc {
    fn new(path: &str, kind: FileKind) -> Self {
        Self {
            path: path.to_string(),
            kind,
            module_doc: None,
            classes: Vec::new(),
            functions: Vec::new(),
            total_elements: 0,
            documented_elements: 0,
            coverage: 0.0,
        }
    }

    fn count(&mut self, documented: bool) {
        self.total_elements += 1;
        if documented {
            self.documented_elements += 1;
        }
    }

    fn finish(mut self) -> Self {
        if self.total_elements > 0 {
            self.coverage = self.documented_elements as f64 / self.total_elements as f64 * 100.0;
        }
        self
    }

    /// Public items with no documentation, module first.
    pub fn undocumented(&self) -> Vec<UndocumentedItem> {
        let mut items = Vec::new();
        if self.module_doc.as_ref().is_some_and(|m| !m.has_doc) {
            items.push(UndocumentedItem {
                kind: ItemKind::Module,
                path: self.path.clone(),
                name: self.path.clone(),
                line: None,
            });
        }
        for class in self.classes.iter().filter(|c| c.is_public && !c.has_doc) {
            items.push(UndocumentedItem {
                kind: ItemKind::Class,
                path: self.path.clone(),
                name: class.name.clone(),
                line: Some(class.line),
            });
        }
        for func in self.functions.iter().filter(|f| f.is_public && !f.has_doc) {
            items.push(UndocumentedItem {
                kind: ItemKind::Function,
                path: self.path.clone(),
                name: func.name.clone(),
                line: Some(func.line),
            });
        }
        items
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Module,
    Class,
    Function,
}

impl ItemKind {
    fn as_str(&self) -> &str {
        match self {
            ItemKind::Module => "module",
            ItemKind::Class => "class",
            ItemKind::Function => "function",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UndocumentedItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub path: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

pub fn analyze_python(path: &str, source: &str) -> FileDoc {
    let module = pysource::parse(source);
    let mut file = FileDoc::new(path, FileKind::Python);
    file.module_doc = Some(ModuleDoc {
        has_doc: module.docstring.is_some(),
        quality: assess_quality(module.docstring.as_deref()),
    });

    let function_doc = |block: &pysource::PyBlock, is_method: bool| FunctionDoc {
        name: block.name.clone(),
        line: block.line,
        is_public: block.is_public(),
        is_method,
        has_doc: block.docstring.is_some(),
        doc_quality: assess_quality(block.docstring.as_deref()),
    };

    for class in module.classes() {
        let methods = module
            .functions()
            .filter(|f| f.class_name.as_deref() == Some(class.name.as_str()) && f.line > class.line && f.line <= class.end_line)
            .map(|f| function_doc(f, true))
            .collect();
        let has_doc = class.docstring.is_some();
        file.count(has_doc);
        file.classes.push(ClassDoc {
            name: class.name.clone(),
            line: class.line,
            is_public: class.is_public(),
            has_doc,
            doc_quality: assess_quality(class.docstring.as_deref()),
            methods,
        });
    }

    for func in module.functions().filter(|f| f.class_name.is_none()) {
        let doc = function_doc(func, false);
        file.count(doc.has_doc);
        file.functions.push(doc);
    }

    file.finish()
}

pub fn analyze_javascript(path: &str, source: &str) -> FileDoc {
    let mut file = FileDoc::new(path, FileKind::Javascript);
    let lines: Vec<&str> = source.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        let stripped = line.trim();
        if stripped.starts_with("//") || stripped.starts_with('*') {
            continue;
        }

        let name = JS_FUNCTION_PATTERNS
            .iter()
            .find_map(|re| re.captures(line).map(|c| c[1].to_string()));
        let Some(name) = name else {
            continue;
        };
        if JS_KEYWORDS.contains(&name.as_str()) {
            continue;
        }

        let has_doc = idx > 0 && {
            let prev = lines[idx - 1].trim();
            prev.starts_with('*') || prev.starts_with("/**")
        };
        file.count(has_doc);
        file.functions.push(FunctionDoc {
            is_public: !name.starts_with('_'),
            name,
            line: idx + 1,
            is_method: false,
            has_doc,
            doc_quality: if has_doc {
                DocQuality::Good
            } else {
                DocQuality::Missing
            },
        });
    }

    file.finish()
}

#[derive(Debug, Clone, Serialize)]
pub struct DocSummary {
    pub total_files: usize,
    pub python_files: usize,
    pub javascript_files: usize,
    pub total_elements: usize,
    pub documented_elements: usize,
    pub undocumented_elements: usize,
    pub overall_coverage: f64,
    pub public_api_missing: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocCoverage {
    pub root: PathBuf,
    pub summary: DocSummary,
    pub files: Vec<FileDoc>,
    pub undocumented: Vec<UndocumentedItem>,
    pub quality_score: f64,
    pub quality_distribution: BTreeMap<DocQuality, usize>,
}

impl DocCoverage {
    pub fn from_files(root: &Path, files: Vec<FileDoc>) -> Self {
        let undocumented: Vec<UndocumentedItem> =
            files.iter().flat_map(|f| f.undocumented()).collect();

        let total_elements: usize = files.iter().map(|f| f.total_elements).sum();
        let documented_elements: usize = files.iter().map(|f| f.documented_elements).sum();
        let summary = DocSummary {
            total_files: files.len(),
            python_files: files.iter().filter(|f| f.kind == FileKind::Python).count(),
            javascript_files: files.iter().filter(|f| f.kind == FileKind::Javascript).count(),
            total_elements,
            documented_elements,
            undocumented_elements: total_elements - documented_elements,
            overall_coverage: if total_elements > 0 {
                documented_elements as f64 / total_elements as f64 * 100.0
            } else {
                0.0
            },
            public_api_missing: undocumented.len(),
        };

        let mut distribution: BTreeMap<DocQuality, usize> =
            DocQuality::ALL.iter().map(|q| (*q, 0)).collect();
        for file in &files {
            let methods = file.classes.iter().flat_map(|c| c.methods.iter());
            for func in file.functions.iter().chain(methods) {
                *distribution.entry(func.doc_quality).or_default() += 1;
            }
        }
        let graded: usize = distribution.values().sum();
        let quality_score = if graded == 0 {
            0.0
        } else {
            let weighted: f64 = distribution
                .iter()
                .map(|(q, n)| q.weight() * *n as f64)
                .sum();
            (weighted / graded as f64 * 100.0).round() / 100.0
        };

        Self {
            root: root.to_path_buf(),
            summary,
            files,
            undocumented,
            quality_score,
            quality_distribution: distribution,
        }
    }

    pub fn quality_level(&self) -> &'static str {
        if self.quality_score >= 80.0 {
            "Excellent ✅"
        } else if self.quality_score >= 60.0 {
            "Good 🟡"
        } else if self.quality_score >= 40.0 {
            "Fair 🟠"
        } else {
            "Needs improvement 🔴"
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Walks `root` and measures documentation in every supported source file.
pub fn scan(root: &Path) -> Result<DocCoverage> {
    let sources = paths::source_files(root, &["py", "js", "ts", "jsx", "tsx"], SKIP_DIRS);
    let mut files = Vec::new();

    for path in &sources {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable file");
                continue;
            }
        };
        let rel = paths::relative(root, path);
        let doc = match path.extension().and_then(|e| e.to_str()) {
            Some("py") => analyze_python(&rel, &source),
            _ => analyze_javascript(&rel, &source),
        };
        files.push(doc);
    }

    tracing::info!(files = files.len(), "Documentation scan finished");
    Ok(DocCoverage::from_files(root, files))
}

const PYTHON_TEMPLATE: &str = r#"def function_name(param1, param2):
    """One-line summary.

    Longer description of what the function does and how.

    Args:
        param1 (type): what param1 is
        param2 (type): what param2 is

    Returns:
        type: what is returned

    Raises:
        ExceptionType: when it is raised

    Examples:
        >>> function_name('value1', 'value2')
        'result'
    """"#;

const JSDOC_TEMPLATE: &str = r#"/**
 * One-line summary.
 *
 * Longer description of what the function does and how.
 *
 * @param {type} param1 - what param1 is
 * @param {type} param2 - what param2 is
 * @returns {type} what is returned
 * @throws {Error} when it is thrown
 *
 * @example
 * functionName('value1', 'value2');
 */
function functionName(param1, param2) {
}"#;

pub fn render(coverage: &DocCoverage, generated_at: Option<NaiveDateTime>) -> Report {
    let summary = &coverage.summary;
    let mut report = Report::new("📚 Documentation Coverage")
        .with_width(WIDTH)
        .with_timestamp(generated_at);
    report.meta("Project", coverage.root.display());

    let mut overview = ReportSection::new("📊 Overview");
    overview.line(format!("  Files analyzed: {}", summary.total_files));
    overview.line(format!("    - Python: {}", summary.python_files));
    overview.line(format!("    - JavaScript/TypeScript: {}", summary.javascript_files));
    overview.line(format!("  Code elements: {}", summary.total_elements));
    overview.line(format!("    - documented: {}", summary.documented_elements));
    overview.line(format!("    - undocumented: {}", summary.undocumented_elements));
    overview.line(format!("  Overall coverage: {:.2}%", summary.overall_coverage));
    overview.line(format!("  Quality score: {:.1}/100", coverage.quality_score));
    overview.line(format!("  Quality level: {}", coverage.quality_level()));
    report.push(overview);

    let mut quality = ReportSection::new("📈 Documentation Quality");
    for q in DocQuality::ALL {
        quality.line(format!(
            "  {}: {}",
            q.as_str(),
            coverage.quality_distribution.get(&q).copied().unwrap_or(0)
        ));
    }
    report.push(quality);

    let mut files = ReportSection::new("📁 Coverage by File");
    files.line(format!(
        "{} {} {} {} Type",
        pad("Path", 50),
        pad("Total", 8),
        pad("Documented", 10),
        pad("Coverage", 10)
    ));
    let mut sorted: Vec<&FileDoc> = coverage.files.iter().collect();
    sorted.sort_by(|a, b| a.coverage.total_cmp(&b.coverage));
    for f in sorted {
        let icon = if f.coverage >= 80.0 {
            "✅"
        } else if f.coverage >= 50.0 {
            "🟡"
        } else {
            "🔴"
        };
        let kind = match f.kind {
            FileKind::Python => "python",
            FileKind::Javascript => "javascript",
        };
        files.line(format!(
            "{} {} {} {:>6.2}% {icon}  {kind}",
            pad(&truncate_end(&f.path, 48), 50),
            pad(&f.total_elements.to_string(), 8),
            pad(&f.documented_elements.to_string(), 10),
            f.coverage
        ));
    }
    report.push(files);

    let mut missing = ReportSection::new("⚠️  Undocumented Public API");
    if coverage.undocumented.is_empty() {
        missing.line("✅ Every public API is documented!");
    } else {
        missing.line(format!(
            "{} public items have no documentation",
            coverage.undocumented.len()
        ));
        missing.blank();

        let mut by_file: Vec<(&str, Vec<&UndocumentedItem>)> = Vec::new();
        for item in &coverage.undocumented {
            match by_file.iter_mut().find(|(p, _)| *p == item.path) {
                Some((_, items)) => items.push(item),
                None => by_file.push((item.path.as_str(), vec![item])),
            }
        }

        for (path, items) in by_file.iter().take(10) {
            missing.line(format!("  📄 {path}"));
            for item in items.iter().take(5) {
                let line = item
                    .line
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "?".to_string());
                missing.line(format!(
                    "    - {}: {} (line {line})",
                    item.kind.as_str(),
                    item.name
                ));
            }
            if items.len() > 5 {
                missing.line(format!("    ... and {} more", items.len() - 5));
            }
            missing.blank();
        }
        if by_file.len() > 10 {
            missing.line(format!(
                "  ... and {} more files with undocumented API",
                by_file.len() - 10
            ));
        }
    }
    report.push(missing);

    let mut advice = ReportSection::new("💡 Recommendations");
    let tips: [&str; 3] = if summary.overall_coverage < 50.0 {
        [
            "Document the public API first",
            "Give every function and class at least a one-line summary",
            "Use the templates below to keep the format consistent",
        ]
    } else if summary.overall_coverage < 80.0 {
        [
            "Flesh out existing docs with parameters and return values",
            "Add usage examples to complex functions",
            "Describe exceptions and error cases",
        ]
    } else {
        [
            "Keep documentation quality where it is",
            "Review and refresh docs regularly",
            "Consider adding more usage examples",
        ]
    };
    for (i, tip) in tips.iter().enumerate() {
        advice.line(format!("  {}. {tip}", i + 1));
    }
    report.push(advice);

    let mut python = ReportSection::new("📋 Python Docstring Template");
    python.lines.extend(PYTHON_TEMPLATE.lines().map(String::from));
    report.push(python);

    let mut jsdoc = ReportSection::new("📋 JSDoc Template");
    jsdoc.lines.extend(JSDOC_TEMPLATE.lines().map(String::from));
    report.push(jsdoc);

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PY: &str = r#""""Service helpers."""


class Service:
    """Coordinates requests.

    Args:
        client: transport
    Returns:
        nothing
    """

    def start(self):
        """Start."""

    def _stop(self):
        pass


class _Hidden:
    pass


def public_helper():
    return 1


def documented():
    """Does a thing that is long enough to count as good."""
"#;

    #[test]
    fn test_assess_quality() {
        assert_eq!(assess_quality(None), DocQuality::Missing);
        assert_eq!(assess_quality(Some("Short.")), DocQuality::Poor);
        assert_eq!(assess_quality(Some("Loads a file.")), DocQuality::Basic);
        assert_eq!(
            assess_quality(Some("Loads the configuration file from disk.")),
            DocQuality::Good
        );
        assert_eq!(
            assess_quality(Some("Loads a file.\n\nArgs:\n  path: where\nReturns:\n  data")),
            DocQuality::Complete
        );
    }

    #[test]
    fn test_analyze_python() {
        let file = analyze_python("svc.py", PY);
        assert!(file.module_doc.as_ref().unwrap().has_doc);
        assert_eq!(file.classes.len(), 2);
        assert_eq!(file.classes[0].methods.len(), 2);
        assert!(file.classes[0].methods.iter().all(|m| m.is_method));
        assert_eq!(file.functions.len(), 2);
        // Service, _Hidden, public_helper, documented
        assert_eq!(file.total_elements, 4);
        assert_eq!(file.documented_elements, 2);
        assert_eq!(file.coverage, 50.0);

        let missing = file.undocumented();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "public_helper");
    }

    #[test]
    fn test_analyze_javascript() {
        let source = "\
/**
 * Adds numbers.
 */
function add(a, b) {
  if (a) {
    return a + b;
  }
}
const mul = (a, b) => a * b;
// function commented() {}
";
        let file = analyze_javascript("math.js", source);
        let names: Vec<&str> = file.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["add", "mul"]);
        assert!(file.functions[0].has_doc);
        assert!(!file.functions[1].has_doc);
        assert_eq!(file.coverage, 50.0);
    }

    #[test]
    fn test_summary_and_quality_score() {
        let coverage = DocCoverage::from_files(
            Path::new("."),
            vec![analyze_python("svc.py", PY)],
        );
        assert_eq!(coverage.summary.total_elements, 4);
        assert_eq!(coverage.summary.public_api_missing, 1);
        // start: poor(20), _stop: missing(0), public_helper: missing(0), documented: good(80)
        assert_eq!(coverage.quality_score, 25.0);
        assert_eq!(coverage.quality_level(), "Needs improvement 🔴");

        let json = coverage.to_json().unwrap();
        assert!(json.contains("\"type\": \"python\""));
        assert!(json.contains("\"doc_quality\": \"good\""));
    }

    #[test]
    fn test_scan_skips_excluded_dirs() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("tests")).unwrap();
        std::fs::write(dir.path().join("tests/test_a.py"), "def test_x():\n    pass\n").unwrap();
        std::fs::write(dir.path().join("app.py"), PY).unwrap();
        std::fs::write(dir.path().join("util.ts"), "export function run() {}\n").unwrap();

        let coverage = scan(dir.path()).unwrap();
        assert_eq!(coverage.summary.total_files, 2);
        assert_eq!(coverage.summary.python_files, 1);
        assert_eq!(coverage.summary.javascript_files, 1);

        let text = render(&coverage, None).render();
        assert!(text.contains("📄 app.py"));
        assert!(text.contains("function: run (line 1)"));
        assert!(text.contains("Python Docstring Template"));
    }

    #[test]
    fn test_empty_project() {
        let dir = TempDir::new().unwrap();
        let coverage = scan(dir.path()).unwrap();
        assert_eq!(coverage.summary.total_files, 0);
        assert_eq!(coverage.quality_score, 0.0);
        let text = render(&coverage, None).render();
        assert!(text.contains("Every public API is documented"));
    }
}
