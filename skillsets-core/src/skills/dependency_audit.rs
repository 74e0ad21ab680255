//! Dependency audit across package managers: known vulnerabilities, outdated
//! packages and licence risks, gathered from each ecosystem's own tooling.

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::ReportSection;
use crate::report::Report;
use crate::runner::CommandRunner;

pub const REPORT_FILE: &str = "dependency_audit_report.txt";

const NPM_TIMEOUT: Duration = Duration::from_secs(60);
const NPM_LS_TIMEOUT: Duration = Duration::from_secs(30);
const AUDIT_TIMEOUT: Duration = Duration::from_secs(120);

const MAX_LISTED: usize = 15;

pub const STRONG_COPYLEFT: &[&str] = &[
    "GPL-2.0", "GPL-2.0+", "GPL-3.0", "GPL-3.0+", "AGPL-3.0", "AGPL-3.0+",
];
pub const RISKY_LICENSES: &[&str] = &["SSPL", "CPAL", "EUPL-1.2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Manager {
    Npm,
    Pip,
    Cargo,
    Composer,
    Maven,
    Gradle,
}

impl Manager {
    pub fn name(&self) -> &str {
        match self {
            Manager::Npm => "npm",
            Manager::Pip => "pip",
            Manager::Cargo => "cargo",
            Manager::Composer => "composer",
            Manager::Maven => "maven",
            Manager::Gradle => "gradle",
        }
    }

    fn icon(&self) -> &str {
        match self {
            Manager::Npm => "📦",
            Manager::Pip => "🐍",
            Manager::Cargo => "🦀",
            Manager::Composer => "🎼",
            Manager::Maven => "☕",
            Manager::Gradle => "🐘",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedManager {
    pub manager: Manager,
    pub manifest: String,
}

/// Package managers whose manifest sits directly in `dir`.
pub fn detect_managers(dir: &Path) -> Vec<DetectedManager> {
    let mut found = Vec::new();
    let mut add = |manager, manifest: &str| {
        found.push(DetectedManager {
            manager,
            manifest: manifest.to_string(),
        })
    };

    if dir.join("package.json").exists() {
        add(Manager::Npm, "package.json");
    }
    if dir.join("requirements.txt").exists() {
        add(Manager::Pip, "requirements.txt");
    } else if dir.join("pyproject.toml").exists() {
        add(Manager::Pip, "pyproject.toml");
    }
    if dir.join("Cargo.toml").exists() {
        add(Manager::Cargo, "Cargo.toml");
    }
    if dir.join("composer.json").exists() {
        add(Manager::Composer, "composer.json");
    }
    if dir.join("pom.xml").exists() {
        add(Manager::Maven, "pom.xml");
    }

    let gradle = std::fs::read_dir(dir).ok().and_then(|entries| {
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("build.gradle"))
            .collect();
        names.sort();
        names.into_iter().next()
    });
    if let Some(name) = gradle {
        add(Manager::Gradle, &name);
    }

    found
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vulnerability {
    pub package: String,
    /// `critical`, `high`, `moderate`/`medium`, `low` or `unknown`.
    pub severity: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedPackage {
    pub name: String,
    pub current: String,
    pub latest: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseRisk {
    StrongCopyleft,
    Risky,
    Unknown,
}

impl LicenseRisk {
    pub fn label(&self) -> &str {
        match self {
            LicenseRisk::StrongCopyleft => "strong copyleft",
            LicenseRisk::Risky => "potential risk",
            LicenseRisk::Unknown => "unknown",
        }
    }

    /// Strong copyleft and risky licences need review; unknown ones are only noted.
    pub fn is_issue(&self) -> bool {
        !matches!(self, LicenseRisk::Unknown)
    }
}

pub fn classify_license(license: &str) -> Option<LicenseRisk> {
    if STRONG_COPYLEFT.contains(&license) {
        Some(LicenseRisk::StrongCopyleft)
    } else if RISKY_LICENSES.contains(&license) {
        Some(LicenseRisk::Risky)
    } else if license == "unknown" {
        Some(LicenseRisk::Unknown)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseFinding {
    pub package: String,
    pub license: String,
    pub risk: LicenseRisk,
}

#[derive(Debug, Clone)]
pub struct ManagerAudit {
    pub manager: Manager,
    pub manifest: String,
    pub vulnerabilities: Vec<Vulnerability>,
    pub outdated: Vec<OutdatedPackage>,
    pub licenses: Vec<LicenseFinding>,
    /// Tool status and guidance lines, in the order they were produced.
    pub notes: Vec<String>,
}

impl ManagerAudit {
    fn new(detected: &DetectedManager) -> Self {
        Self {
            manager: detected.manager,
            manifest: detected.manifest.clone(),
            vulnerabilities: Vec::new(),
            outdated: Vec::new(),
            licenses: Vec::new(),
            notes: Vec::new(),
        }
    }

    fn note(&mut self, line: impl Into<String>) {
        self.notes.push(line.into());
    }
}

// npm

#[derive(Deserialize)]
struct NpmAudit {
    #[serde(default)]
    vulnerabilities: BTreeMap<String, NpmVulnerability>,
}

#[derive(Deserialize)]
struct NpmVulnerability {
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    via: Vec<NpmVia>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NpmVia {
    Advisory { title: Option<String> },
    Package(String),
}

pub fn parse_npm_audit(json: &str) -> Result<Vec<Vulnerability>> {
    let audit: NpmAudit = serde_json::from_str(json)?;
    Ok(audit
        .vulnerabilities
        .into_iter()
        .map(|(name, v)| {
            let title = v
                .via
                .iter()
                .find_map(|via| match via {
                    NpmVia::Advisory { title } => title.clone(),
                    NpmVia::Package(_) => None,
                })
                .or_else(|| {
                    v.via.iter().find_map(|via| match via {
                        NpmVia::Package(dep) => Some(format!("via {dep}")),
                        NpmVia::Advisory { .. } => None,
                    })
                })
                .unwrap_or_else(|| "No title".to_string());
            Vulnerability {
                package: name,
                severity: v.severity.unwrap_or_else(|| "unknown".to_string()),
                title,
            }
        })
        .collect())
}

#[derive(Deserialize)]
struct NpmOutdatedEntry {
    current: Option<String>,
    latest: Option<String>,
}

pub fn parse_npm_outdated(json: &str) -> Result<Vec<OutdatedPackage>> {
    let entries: BTreeMap<String, NpmOutdatedEntry> = serde_json::from_str(json)?;
    Ok(entries
        .into_iter()
        .map(|(name, e)| OutdatedPackage {
            name,
            current: e.current.unwrap_or_else(|| "unknown".to_string()),
            latest: e.latest.unwrap_or_else(|| "unknown".to_string()),
        })
        .collect())
}

#[derive(Deserialize)]
struct NpmList {
    #[serde(default)]
    dependencies: BTreeMap<String, NpmListEntry>,
}

#[derive(Deserialize)]
struct NpmListEntry {
    license: Option<String>,
}

pub fn parse_npm_licenses(json: &str) -> Result<Vec<LicenseFinding>> {
    let list: NpmList = serde_json::from_str(json)?;
    Ok(list
        .dependencies
        .into_iter()
        .filter_map(|(name, entry)| {
            let license = entry.license.unwrap_or_else(|| "unknown".to_string());
            classify_license(&license).map(|risk| LicenseFinding {
                package: name,
                license,
                risk,
            })
        })
        .collect())
}

// pip

#[derive(Deserialize)]
struct PipAudit {
    #[serde(default)]
    dependencies: Vec<PipAuditDependency>,
}

#[derive(Deserialize)]
struct PipAuditDependency {
    name: String,
    #[serde(default, alias = "vulnerabilities")]
    vulns: Vec<PipAuditVuln>,
}

#[derive(Deserialize)]
struct PipAuditVuln {
    id: Option<String>,
    severity: Option<String>,
}

pub fn parse_pip_audit(json: &str) -> Result<Vec<Vulnerability>> {
    let audit: PipAudit = serde_json::from_str(json)?;
    Ok(audit
        .dependencies
        .into_iter()
        .flat_map(|dep| {
            let name = dep.name;
            dep.vulns.into_iter().map(move |v| Vulnerability {
                package: name.clone(),
                severity: v.severity.unwrap_or_else(|| "unknown".to_string()),
                title: v.id.unwrap_or_else(|| "No title".to_string()),
            })
        })
        .collect())
}

#[derive(Deserialize)]
struct PipOutdated {
    name: String,
    version: Option<String>,
    latest_version: Option<String>,
}

pub fn parse_pip_outdated(json: &str) -> Result<Vec<OutdatedPackage>> {
    let entries: Vec<PipOutdated> = serde_json::from_str(json)?;
    Ok(entries
        .into_iter()
        .map(|e| OutdatedPackage {
            name: e.name,
            current: e.version.unwrap_or_else(|| "unknown".to_string()),
            latest: e.latest_version.unwrap_or_else(|| "unknown".to_string()),
        })
        .collect())
}

// cargo

#[derive(Deserialize)]
struct CargoAudit {
    vulnerabilities: Option<CargoVulnerabilities>,
}

#[derive(Deserialize)]
struct CargoVulnerabilities {
    #[serde(default)]
    list: Vec<CargoVulnerability>,
}

#[derive(Deserialize)]
struct CargoVulnerability {
    advisory: CargoAdvisory,
}

#[derive(Deserialize)]
struct CargoAdvisory {
    package: Option<String>,
    title: Option<String>,
    severity: Option<String>,
}

/// RustSec severities onto the four-level scale; `none` counts as low.
pub fn map_rust_severity(severity: &str) -> &'static str {
    match severity.to_lowercase().as_str() {
        "critical" => "critical",
        "high" => "high",
        "medium" => "medium",
        "low" | "none" => "low",
        _ => "unknown",
    }
}

pub fn parse_cargo_audit(json: &str) -> Result<Vec<Vulnerability>> {
    let audit: CargoAudit = serde_json::from_str(json)?;
    Ok(audit
        .vulnerabilities
        .map(|v| v.list)
        .unwrap_or_default()
        .into_iter()
        .map(|v| {
            let a = v.advisory;
            Vulnerability {
                package: a.package.unwrap_or_else(|| "unknown".to_string()),
                severity: map_rust_severity(a.severity.as_deref().unwrap_or("unknown"))
                    .to_string(),
                title: a.title.unwrap_or_else(|| "No title".to_string()),
            }
        })
        .collect())
}

#[derive(Deserialize)]
struct CargoOutdatedMember {
    #[serde(default)]
    dependencies: Vec<CargoOutdatedDependency>,
}

#[derive(Deserialize)]
struct CargoOutdatedDependency {
    name: String,
    project: Option<String>,
    latest: Option<String>,
}

/// `cargo outdated --format=json` prints one object per workspace member.
pub fn parse_cargo_outdated(text: &str) -> Result<Vec<OutdatedPackage>> {
    let mut outdated = Vec::new();
    for line in text.lines().filter(|l| l.trim_start().starts_with('{')) {
        let member: CargoOutdatedMember = serde_json::from_str(line)?;
        outdated.extend(member.dependencies.into_iter().map(|d| OutdatedPackage {
            name: d.name,
            current: d.project.unwrap_or_else(|| "unknown".to_string()),
            latest: d.latest.unwrap_or_else(|| "unknown".to_string()),
        }));
    }
    Ok(outdated)
}

// composer

#[derive(Deserialize)]
struct ComposerAudit {
    #[serde(default)]
    advisories: ComposerAdvisories,
}

/// Composer prints `[]` when there are no advisories and a map otherwise.
#[derive(Deserialize, Default)]
#[serde(untagged)]
enum ComposerAdvisories {
    Map(BTreeMap<String, ComposerPackageAdvisories>),
    List(Vec<serde::de::IgnoredAny>),
    #[default]
    None,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ComposerPackageAdvisories {
    Many(Vec<ComposerAdvisory>),
    Keyed(BTreeMap<String, ComposerAdvisory>),
    One(ComposerAdvisory),
}

#[derive(Deserialize)]
struct ComposerAdvisory {
    title: Option<String>,
    severity: Option<String>,
}

pub fn parse_composer_audit(json: &str) -> Result<Vec<Vulnerability>> {
    let audit: ComposerAudit = serde_json::from_str(json)?;
    let ComposerAdvisories::Map(map) = audit.advisories else {
        return Ok(Vec::new());
    };

    let mut found = Vec::new();
    for (package, advisories) in map {
        let list: Vec<ComposerAdvisory> = match advisories {
            ComposerPackageAdvisories::Many(v) => v,
            ComposerPackageAdvisories::Keyed(m) => m.into_values().collect(),
            ComposerPackageAdvisories::One(a) => vec![a],
        };
        found.extend(list.into_iter().map(|a| Vulnerability {
            package: package.clone(),
            severity: a.severity.unwrap_or_else(|| "unknown".to_string()),
            title: a.title.unwrap_or_else(|| "No title".to_string()),
        }));
    }
    Ok(found)
}

#[derive(Deserialize)]
struct ComposerOutdated {
    #[serde(default)]
    installed: Vec<ComposerInstalled>,
}

#[derive(Deserialize)]
struct ComposerInstalled {
    name: String,
    version: Option<String>,
    latest: Option<String>,
}

pub fn parse_composer_outdated(json: &str) -> Result<Vec<OutdatedPackage>> {
    let outdated: ComposerOutdated = serde_json::from_str(json)?;
    Ok(outdated
        .installed
        .into_iter()
        .filter_map(|p| {
            let latest = p.latest.filter(|l| !l.is_empty())?;
            Some(OutdatedPackage {
                name: p.name,
                current: p.version.unwrap_or_else(|| "unknown".to_string()),
                latest,
            })
        })
        .collect())
}

/// One audit tool invocation.
struct Tool {
    program: &'static str,
    args: &'static [&'static str],
    timeout: Duration,
    install_hint: Option<&'static str>,
}

const NPM_AUDIT: Tool = Tool {
    program: "npm",
    args: &["audit", "--json"],
    timeout: NPM_TIMEOUT,
    install_hint: None,
};
const NPM_OUTDATED: Tool = Tool {
    program: "npm",
    args: &["outdated", "--json"],
    timeout: NPM_TIMEOUT,
    install_hint: None,
};
const NPM_LS: Tool = Tool {
    program: "npm",
    args: &["ls", "--json", "--depth=0"],
    timeout: NPM_LS_TIMEOUT,
    install_hint: None,
};
const PIP_AUDIT: Tool = Tool {
    program: "pip-audit",
    args: &["--format", "json"],
    timeout: AUDIT_TIMEOUT,
    install_hint: Some("pip install pip-audit"),
};
const PIP_OUTDATED: Tool = Tool {
    program: "pip",
    args: &["list", "--outdated", "--format=json"],
    timeout: NPM_TIMEOUT,
    install_hint: None,
};
const CARGO_AUDIT: Tool = Tool {
    program: "cargo",
    args: &["audit", "--json"],
    timeout: AUDIT_TIMEOUT,
    install_hint: Some("cargo install cargo-audit"),
};
const CARGO_OUTDATED: Tool = Tool {
    program: "cargo",
    args: &["outdated", "--format=json"],
    timeout: AUDIT_TIMEOUT,
    install_hint: Some("cargo install cargo-outdated"),
};
const COMPOSER_AUDIT: Tool = Tool {
    program: "composer",
    args: &["audit", "--format=json"],
    timeout: AUDIT_TIMEOUT,
    install_hint: None,
};
const COMPOSER_OUTDATED: Tool = Tool {
    program: "composer",
    args: &["outdated", "--format=json"],
    timeout: NPM_TIMEOUT,
    install_hint: None,
};

fn note_vulnerabilities(audit: &mut ManagerAudit, found: Vec<Vulnerability>) {
    if found.is_empty() {
        audit.note("✅ No known vulnerabilities");
        return;
    }
    audit.note(format!("⚠️  {} vulnerabilities found:", found.len()));
    for v in found.iter().take(MAX_LISTED) {
        audit.note(format!(
            "   - [{}] {}: {}",
            v.severity.to_uppercase(),
            v.package,
            v.title
        ));
    }
    audit.vulnerabilities = found;
}

fn note_outdated(audit: &mut ManagerAudit, found: Vec<OutdatedPackage>) {
    if found.is_empty() {
        audit.note("✅ All dependencies are up to date");
        return;
    }
    audit.note(format!("⚠️  {} outdated dependencies:", found.len()));
    for p in found.iter().take(MAX_LISTED) {
        audit.note(format!("   - {}: {} → {}", p.name, p.current, p.latest));
    }
    audit.outdated = found;
}

fn note_licenses(audit: &mut ManagerAudit, found: Vec<LicenseFinding>) {
    let issues: Vec<String> = found
        .iter()
        .filter(|l| l.risk.is_issue())
        .map(|l| format!("   - {}: {} ({})", l.package, l.license, l.risk.label()))
        .collect();
    if issues.is_empty() {
        audit.note("✅ Licence check passed");
    } else {
        audit.note("⚠️  Licence compliance issues:");
        audit.notes.extend(issues);
    }
    audit.licenses = found;
}

/// Runs `tool` and hands its parsed output to `record`. Missing tools,
/// failures and unparsable output become notes instead of errors.
async fn check<T>(
    runner: &dyn CommandRunner,
    audit: &mut ManagerAudit,
    label: &str,
    tool: &Tool,
    parse: fn(&str) -> Result<Vec<T>>,
    record: fn(&mut ManagerAudit, Vec<T>),
) {
    audit.note(format!("{label} ({} {})...", tool.program, tool.args.join(" ")));

    // Audit tools exit non-zero when they find something, so stdout is
    // used whatever the exit status.
    match runner
        .run_with_timeout(tool.program, tool.args, tool.timeout)
        .await
    {
        Ok(out) if out.stdout.trim().is_empty() && out.success => record(audit, Vec::new()),
        Ok(out) if out.stdout.trim().is_empty() => {
            let reason = out.stderr.trim().lines().next().unwrap_or("no output").to_string();
            audit.note(format!("⚠️  {} failed: {reason}", tool.program));
        }
        Ok(out) => match parse(&out.stdout) {
            Ok(found) => record(audit, found),
            Err(err) => {
                tracing::warn!(program = tool.program, error = %err, "Unparsable tool output");
                audit.note(format!("⚠️  Could not parse {} output", tool.program));
            }
        },
        Err(Error::ToolNotFound(_)) => {
            audit.note(format!("ℹ️  {} is not installed; skipped", tool.program));
            if let Some(hint) = tool.install_hint {
                audit.note(format!("   Install: {hint}"));
            }
        }
        Err(err) => audit.note(format!("⚠️  {} failed: {err}", tool.program)),
    }
    audit.note("");
}

const SECURITY: &str = "🔒 Security scan";
const OUTDATED: &str = "📅 Outdated check";

async fn audit_npm(runner: &dyn CommandRunner, audit: &mut ManagerAudit) {
    check(runner, audit, SECURITY, &NPM_AUDIT, parse_npm_audit, note_vulnerabilities).await;
    check(runner, audit, OUTDATED, &NPM_OUTDATED, parse_npm_outdated, note_outdated).await;
    check(runner, audit, "📜 Licence check", &NPM_LS, parse_npm_licenses, note_licenses).await;
}

async fn audit_pip(runner: &dyn CommandRunner, audit: &mut ManagerAudit) {
    check(runner, audit, SECURITY, &PIP_AUDIT, parse_pip_audit, note_vulnerabilities).await;
    check(runner, audit, OUTDATED, &PIP_OUTDATED, parse_pip_outdated, note_outdated).await;
    audit.note("📜 Licence check:");
    audit.note("ℹ️  Python licence checks need pip-licenses");
    audit.note("   Install: pip install pip-licenses");
    audit.note("   Run: pip-licenses --format=json");
}

async fn audit_cargo(runner: &dyn CommandRunner, audit: &mut ManagerAudit) {
    check(runner, audit, SECURITY, &CARGO_AUDIT, parse_cargo_audit, note_vulnerabilities).await;
    check(runner, audit, OUTDATED, &CARGO_OUTDATED, parse_cargo_outdated, note_outdated).await;
    audit.note("📜 Licence check:");
    audit.note("ℹ️  Rust licence checks: cargo about (or cargo deny check licenses)");
}

async fn audit_composer(runner: &dyn CommandRunner, audit: &mut ManagerAudit) {
    check(runner, audit, SECURITY, &COMPOSER_AUDIT, parse_composer_audit, note_vulnerabilities)
        .await;
    check(runner, audit, OUTDATED, &COMPOSER_OUTDATED, parse_composer_outdated, note_outdated)
        .await;
}

fn audit_jvm(audit: &mut ManagerAudit) {
    let build_tool = if audit.manager == Manager::Maven {
        "Maven"
    } else {
        "Gradle"
    };
    audit.note(format!("ℹ️  {build_tool} dependency audits need extra tooling:"));
    audit.note("   - OWASP Dependency-Check: https://owasp.org/www-project-dependency-check/");
    audit.note("   - Snyk: https://snyk.io/");
}

#[derive(Debug, Clone)]
pub struct DependencyAudit {
    pub dir: PathBuf,
    pub managers: Vec<ManagerAudit>,
}

impl DependencyAudit {
    pub fn vulnerabilities(&self) -> impl Iterator<Item = &Vulnerability> {
        self.managers.iter().flat_map(|m| m.vulnerabilities.iter())
    }

    pub fn outdated_count(&self) -> usize {
        self.managers.iter().map(|m| m.outdated.len()).sum()
    }

    pub fn license_issue_count(&self) -> usize {
        self.managers
            .iter()
            .flat_map(|m| m.licenses.iter())
            .filter(|l| l.risk.is_issue())
            .count()
    }

    pub fn with_severity(&self, severity: &str) -> Vec<&Vulnerability> {
        self.vulnerabilities()
            .filter(|v| v.severity.eq_ignore_ascii_case(severity))
            .collect()
    }
}

/// Audits every package manager detected in the runner's working directory.
pub async fn audit(runner: &dyn CommandRunner) -> Result<DependencyAudit> {
    let dir = runner.working_dir().to_path_buf();
    let detected = detect_managers(&dir);
    tracing::info!(count = detected.len(), "Detected package managers");

    let mut managers = Vec::new();
    for d in &detected {
        let mut audit = ManagerAudit::new(d);
        match d.manager {
            Manager::Npm => audit_npm(runner, &mut audit).await,
            Manager::Pip => audit_pip(runner, &mut audit).await,
            Manager::Cargo => audit_cargo(runner, &mut audit).await,
            Manager::Composer => audit_composer(runner, &mut audit).await,
            Manager::Maven | Manager::Gradle => audit_jvm(&mut audit),
        }
        managers.push(audit);
    }

    Ok(DependencyAudit { dir, managers })
}

pub fn render(audit: &DependencyAudit, generated_at: Option<NaiveDateTime>) -> Report {
    let mut report = Report::new("🔍 Dependency Security Audit").with_timestamp(generated_at);
    report.meta("Directory", audit.dir.display());

    let mut detected = ReportSection::new("🔍 Package Managers");
    if audit.managers.is_empty() {
        detected.line("⚠️  No package manager manifests found");
        detected.line("Supported: npm, pip, cargo, composer, maven, gradle");
        report.push(detected);
        return report;
    }
    for m in &audit.managers {
        detected.line(format!("✅ {} ({})", m.manager.name(), m.manifest));
    }
    report.push(detected);

    for m in &audit.managers {
        let mut section = ReportSection::new(format!(
            "{} {} Dependencies",
            m.manager.icon(),
            m.manager.name().to_uppercase()
        ));
        for note in &m.notes {
            section.line(note.clone());
        }
        report.push(section);
    }

    let total_vulns = audit.vulnerabilities().count();
    let outdated = audit.outdated_count();
    let license_issues = audit.license_issue_count();

    let mut summary = ReportSection::new("📊 Summary");
    summary.line(format!("Package managers: {}", audit.managers.len()));
    summary.line(format!("  Vulnerabilities: {total_vulns}"));
    summary.line(format!("  Outdated dependencies: {outdated}"));
    summary.line(format!("  Licence issues: {license_issues}"));
    report.push(summary);

    let mut actions = ReportSection::new("🎯 Recommended Actions");
    let critical = audit.with_severity("critical");
    if !critical.is_empty() {
        actions.line("🚨 Top priority: fix critical vulnerabilities now");
        for v in critical.iter().take(5) {
            actions.line(format!("   - {}", v.package));
        }
        actions.blank();
    }
    let high = audit.with_severity("high");
    if !high.is_empty() {
        actions.line("⚠️  Next: fix high-severity vulnerabilities soon");
        for v in high.iter().take(5) {
            actions.line(format!("   - {}", v.package));
        }
        actions.blank();
    }
    if outdated > 0 {
        actions.line(format!(
            "📦 Update {outdated} outdated dependencies for the latest features and fixes"
        ));
    }
    if license_issues > 0 {
        actions.line(format!("📜 Review {license_issues} licence compliance issues"));
    }
    if total_vulns == 0 && outdated == 0 && license_issues == 0 {
        actions.line("✅ All checks passed; dependencies look healthy");
    }
    report.push(actions);

    let mut next = ReportSection::new("📝 Next Steps");
    next.line("1. Install the recommended audit tools for broader coverage");
    next.line("2. Run this audit regularly (monthly is a good default)");
    next.line("3. Add security scanning to CI");
    next.line("4. Subscribe to security advisories for your ecosystems");
    report.push(next);

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::ScriptedRunner;
    use tempfile::TempDir;

    #[test]
    fn test_detect_managers() {
        let dir = TempDir::new().unwrap();
        for name in ["package.json", "requirements.txt", "pyproject.toml", "build.gradle.kts"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let found = detect_managers(dir.path());
        let names: Vec<(&str, &str)> = found
            .iter()
            .map(|d| (d.manager.name(), d.manifest.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("npm", "package.json"),
                ("pip", "requirements.txt"),
                ("gradle", "build.gradle.kts")
            ]
        );
    }

    #[test]
    fn test_parse_npm_audit() {
        let json = r#"{
            "auditReportVersion": 2,
            "vulnerabilities": {
                "lodash": {"name": "lodash", "severity": "high",
                           "via": [{"source": 1, "title": "Prototype Pollution"}]},
                "wrapper": {"name": "wrapper", "severity": "moderate", "via": ["lodash"]}
            }
        }"#;
        let vulns = parse_npm_audit(json).unwrap();
        assert_eq!(vulns.len(), 2);
        assert_eq!(vulns[0].package, "lodash");
        assert_eq!(vulns[0].title, "Prototype Pollution");
        assert_eq!(vulns[1].title, "via lodash");
        assert_eq!(vulns[1].severity, "moderate");
    }

    #[test]
    fn test_parse_npm_outdated_and_licenses() {
        let outdated =
            parse_npm_outdated(r#"{"react": {"current": "17.0.2", "wanted": "17.0.2", "latest": "18.2.0"}}"#)
                .unwrap();
        assert_eq!(outdated[0].current, "17.0.2");
        assert_eq!(outdated[0].latest, "18.2.0");

        let licenses = parse_npm_licenses(
            r#"{"dependencies": {"a": {"license": "GPL-3.0"}, "b": {"license": "MIT"}, "c": {}}}"#,
        )
        .unwrap();
        assert_eq!(licenses.len(), 2);
        assert_eq!(licenses[0].risk, LicenseRisk::StrongCopyleft);
        assert_eq!(licenses[1].risk, LicenseRisk::Unknown);
        assert!(!licenses[1].risk.is_issue());
    }

    #[test]
    fn test_parse_pip() {
        let audit = parse_pip_audit(
            r#"{"dependencies": [
                {"name": "flask", "version": "0.5", "vulns": [{"id": "PYSEC-1", "fix_versions": ["1.0"]}]},
                {"name": "ok", "version": "1.0", "vulns": []}
            ]}"#,
        )
        .unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].title, "PYSEC-1");
        assert_eq!(audit[0].severity, "unknown");

        let outdated = parse_pip_outdated(
            r#"[{"name": "requests", "version": "2.0.0", "latest_version": "2.31.0", "latest_filetype": "wheel"}]"#,
        )
        .unwrap();
        assert_eq!(outdated[0].latest, "2.31.0");
    }

    #[test]
    fn test_parse_cargo() {
        let audit = parse_cargo_audit(
            r#"{"vulnerabilities": {"found": true, "count": 1, "list": [
                {"advisory": {"id": "RUSTSEC-2020-0001", "package": "smallvec", "title": "Buffer overflow", "severity": "None"}}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(audit[0].package, "smallvec");
        assert_eq!(audit[0].severity, "low");
        assert_eq!(map_rust_severity("CRITICAL"), "critical");
        assert_eq!(map_rust_severity("weird"), "unknown");

        let outdated = parse_cargo_outdated(
            "{\"crate_name\":\"app\",\"dependencies\":[{\"name\":\"serde\",\"project\":\"1.0.0\",\"compat\":\"1.0.200\",\"latest\":\"1.0.200\",\"kind\":\"Normal\",\"platform\":null}]}\n",
        )
        .unwrap();
        assert_eq!(outdated.len(), 1);
        assert_eq!(outdated[0].current, "1.0.0");
    }

    #[test]
    fn test_parse_composer() {
        let audit = parse_composer_audit(
            r#"{"advisories": {"symfony/http-kernel": [{"title": "CVE-2022-1", "severity": "high"}]}}"#,
        )
        .unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].severity, "high");
        assert!(parse_composer_audit(r#"{"advisories": []}"#).unwrap().is_empty());
        assert!(parse_composer_audit(r#"{"advisories": [{"title": "x"}]}"#)
            .unwrap()
            .is_empty());

        let outdated = parse_composer_outdated(
            r#"{"installed": [{"name": "a/b", "version": "1.0", "latest": "2.0"}, {"name": "c/d", "version": "1.0", "latest": ""}]}"#,
        )
        .unwrap();
        assert_eq!(outdated.len(), 1);
    }

    #[tokio::test]
    async fn test_audit_npm_project() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        let runner = ScriptedRunner::in_dir(dir.path())
            .output(
                "npm audit --json",
                crate::runner::CommandOutput {
                    success: false,
                    code: Some(1),
                    stdout: r#"{"vulnerabilities": {"minimist": {"severity": "critical", "via": [{"title": "Prototype Pollution"}]}}}"#.into(),
                    stderr: String::new(),
                },
            )
            .on("npm outdated --json", "{}")
            .on("npm ls --json --depth=0", r#"{"dependencies": {}}"#);

        let result = audit(&runner).await.unwrap();
        assert_eq!(result.managers.len(), 1);
        assert_eq!(result.with_severity("critical").len(), 1);

        let text = render(&result, None).render();
        assert!(text.contains("[CRITICAL] minimist: Prototype Pollution"));
        assert!(text.contains("✅ All dependencies are up to date"));
        assert!(text.contains("🚨 Top priority"));
    }

    #[tokio::test]
    async fn test_audit_missing_tool() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();
        let runner = ScriptedRunner::in_dir(dir.path()).missing("cargo");

        let result = audit(&runner).await.unwrap();
        let notes = result.managers[0].notes.join("\n");
        assert!(notes.contains("cargo is not installed"));
        assert!(notes.contains("cargo install cargo-audit"));
    }

    #[test]
    fn test_render_without_managers() {
        let audit = DependencyAudit {
            dir: PathBuf::from("/tmp/project"),
            managers: Vec::new(),
        };
        let text = render(&audit, None).render();
        assert!(text.contains("No package manager manifests found"));
        assert!(!text.contains("Summary"));
    }
}
