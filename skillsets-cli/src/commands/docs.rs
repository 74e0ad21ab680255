use anyhow::Result;
use colored::Colorize;
use skillsets_core::skills::doc_coverage;
use std::path::PathBuf;

use super::{heading, summary_line, with_spinner, Context};

pub async fn run(ctx: &Context, path: Option<PathBuf>) -> Result<()> {
    let root = ctx.scan_root(path);
    let coverage = with_spinner(
        &format!("Checking documentation in {}...", root.display()),
        async { doc_coverage::scan(&root) },
    )
    .await?;

    let report = doc_coverage::render(&coverage, ctx.generated_at);
    ctx.save(doc_coverage::REPORT_FILE, &report.render())?;
    ctx.save(doc_coverage::JSON_FILE, &coverage.to_json()?)?;

    let summary = &coverage.summary;
    println!();
    heading("Documentation coverage");
    summary_line(
        "Files",
        format!(
            "{} ({} Python, {} JavaScript/TypeScript)",
            summary.total_files, summary.python_files, summary.javascript_files
        ),
    );
    summary_line(
        "Coverage",
        format!(
            "{:.1}% ({}/{})",
            summary.overall_coverage, summary.documented_elements, summary.total_elements
        ),
    );
    summary_line(
        "Quality",
        format!("{:.1} {}", coverage.quality_score, coverage.quality_level()),
    );
    if summary.public_api_missing > 0 {
        summary_line(
            "Undocumented public items",
            summary.public_api_missing.to_string().yellow(),
        );
    }
    Ok(())
}
