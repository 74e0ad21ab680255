use anyhow::Result;
use colored::Colorize;
use skillsets_core::skills::dependency_audit;

use super::{heading, summary_line, with_spinner, Context};

pub async fn run(ctx: &Context) -> Result<()> {
    let audit = with_spinner(
        "Auditing dependencies (this can take a few minutes)...",
        dependency_audit::audit(&ctx.runner),
    )
    .await?;

    let report = dependency_audit::render(&audit, ctx.generated_at);
    ctx.save(dependency_audit::REPORT_FILE, &report.render())?;

    println!();
    heading("Dependency audit");
    if audit.managers.is_empty() {
        println!("  {}", "No supported package manifest found".yellow());
        return Ok(());
    }
    let managers: Vec<String> = audit
        .managers
        .iter()
        .map(|m| m.manager.name().to_string())
        .collect();
    summary_line("Package managers", managers.join(", "));
    let vulnerabilities = audit.vulnerabilities().count();
    let vulnerabilities = if vulnerabilities > 0 {
        vulnerabilities.to_string().red()
    } else {
        vulnerabilities.to_string().green()
    };
    summary_line("Vulnerabilities", vulnerabilities);
    for severity in ["critical", "high"] {
        let count = audit.with_severity(severity).len();
        if count > 0 {
            println!("    {severity}: {count}");
        }
    }
    summary_line("Outdated packages", audit.outdated_count());
    summary_line("License issues", audit.license_issue_count());
    for note in audit.managers.iter().flat_map(|m| m.notes.iter()) {
        println!("  {} {note}", "!".yellow().bold());
    }
    Ok(())
}
