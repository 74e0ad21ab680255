use anyhow::Result;
use colored::Colorize;
use skillsets_core::skills::churn;

use super::{heading, summary_line, with_spinner, Context};

pub async fn run(ctx: &Context, days: Option<i64>) -> Result<()> {
    let days = days.unwrap_or(ctx.config.churn.days);
    let data = with_spinner(
        &format!("Reading {days} days of file changes..."),
        churn::fetch(&ctx.runner, days),
    )
    .await?;
    println!("{} {} commits", "✅ Loaded".green(), data.commits.len());

    let analysis = churn::analyze(&data.commits, days, churn::size_on_disk(&data.root));
    let report = churn::render(&analysis, ctx.generated_at);
    ctx.save(churn::REPORT_FILE, &report.render())?;

    let (high, medium, low) = analysis.distribution();
    println!();
    heading("Code churn");
    summary_line("Commits", analysis.total_commits);
    summary_line("Files changed", analysis.files.len());
    summary_line(
        "Stability",
        format!(
            "{} high, {} medium, {} low",
            high.to_string().green(),
            medium.to_string().yellow(),
            low.to_string().red()
        ),
    );
    if let Some(top) = analysis.files.first() {
        summary_line("Most changed", format!("{} ({} commits)", top.path, top.commits));
    }
    Ok(())
}
