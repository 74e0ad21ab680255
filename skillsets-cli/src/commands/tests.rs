use anyhow::Result;
use colored::Colorize;
use skillsets_core::skills::test_coverage::{self, Level};

use super::{heading, summary_line, with_spinner, Context};

pub async fn run(ctx: &Context) -> Result<()> {
    let data = with_spinner("Looking for coverage data...", test_coverage::collect(&ctx.runner))
        .await?;

    let report = test_coverage::render(data.as_ref(), ctx.generated_at);
    ctx.save(test_coverage::REPORT_FILE, &report.render())?;

    println!();
    heading("Test coverage");
    let Some(data) = data else {
        println!(
            "  {}",
            "No coverage data found; the report lists how to produce it".yellow()
        );
        return Ok(());
    };
    let overall = data.overall();
    let level = Level::from_percent(overall);
    summary_line("Tool", data.format.tool());
    summary_line("Files", data.files.len());
    summary_line(
        "Coverage",
        format!("{overall:.1}% {} {}", level.icon(), level.as_str()),
    );
    if let Some(branch) = data.branch_coverage() {
        summary_line("Branch coverage", format!("{branch:.1}%"));
    }
    Ok(())
}
