use anyhow::Result;
use colored::Colorize;
use skillsets_core::skills::code_smells::{self, Severity};
use std::path::PathBuf;

use super::{heading, summary_line, with_spinner, Context};

pub async fn run(ctx: &Context, project_dir: Option<PathBuf>, output: Option<String>) -> Result<()> {
    let root = ctx.scan_root(project_dir);
    let scan = with_spinner(
        &format!("Scanning {}...", root.display()),
        async { code_smells::scan(&root) },
    )
    .await?;
    println!(
        "{} {} of {} source files",
        "✅ Analyzed".green(),
        scan.files_analyzed,
        scan.total_files
    );

    let report = code_smells::render(&scan, ctx.generated_at);
    let file_name = output.as_deref().unwrap_or(code_smells::REPORT_FILE);
    ctx.save(file_name, &report.render())?;

    let score = scan.score();
    let by_severity = scan.by_severity();
    println!();
    heading("Code smells");
    summary_line(
        "Quality score",
        format!("{score}/100 ({})", code_smells::rating(score)),
    );
    summary_line("Smells", scan.smells.len());
    for severity in Severity::ALL {
        let count = by_severity.get(&severity).copied().unwrap_or(0);
        if count > 0 {
            println!("    {} {}: {count}", severity.icon(), severity.as_str());
        }
    }
    Ok(())
}
