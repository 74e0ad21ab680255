use anyhow::Result;
use colored::Colorize;
use skillsets_core::skills::commit_analyzer;

use super::{heading, summary_line, with_spinner, Context};

pub async fn run(ctx: &Context, limit: Option<usize>) -> Result<()> {
    let commits = with_spinner(
        "Reading git history...",
        commit_analyzer::fetch(&ctx.runner, limit),
    )
    .await?;
    println!("{} {} commits", "✅ Loaded".green(), commits.len());

    let analysis = commit_analyzer::analyze(&commits);
    let report = commit_analyzer::render(&analysis, ctx.generated_at);
    ctx.save(commit_analyzer::REPORT_FILE, &report.render())?;

    println!();
    heading("Commit summary");
    summary_line("Commits", analysis.total);
    summary_line("Contributors", analysis.contributors.len());
    summary_line("Days covered", analysis.days_span());
    summary_line(
        "Conventional commits",
        format!("{}/{}", analysis.conventional_count, analysis.total),
    );
    if let Some(top) = analysis.contributors.first() {
        summary_line("Top contributor", format!("{} ({})", top.author, top.commits));
    }
    Ok(())
}
