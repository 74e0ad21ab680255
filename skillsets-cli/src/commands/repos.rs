use anyhow::{Context as _, Result};
use colored::Colorize;
use skillsets_core::skills::repo_analyzer::{self, gigabytes};

use super::{heading, summary_line, with_spinner, Context};

pub async fn run(ctx: &Context) -> Result<()> {
    let repos = with_spinner("Listing GitHub repositories...", repo_analyzer::fetch(&ctx.runner))
        .await
        .context("Listing repositories needs the GitHub CLI (gh) installed and authenticated")?;
    println!("{} {} repositories", "✅ Found".green(), repos.len());

    let analysis = repo_analyzer::analyze(&repos, ctx.today());
    let report = repo_analyzer::render(&analysis, ctx.generated_at);
    ctx.save(repo_analyzer::REPORT_FILE, &report.render())?;

    println!();
    heading("GitHub repositories");
    summary_line("Total", analysis.total);
    summary_line("Forks", analysis.forks.len());
    summary_line("Originals", analysis.originals.len());
    summary_line(
        "Cleanup candidates",
        analysis.cleanup_count().to_string().yellow(),
    );
    summary_line(
        "Reclaimable",
        format!("{:.2} GB", gigabytes(analysis.reclaimable_kb())),
    );
    Ok(())
}
