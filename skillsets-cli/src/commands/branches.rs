use anyhow::Result;
use colored::Colorize;
use skillsets_core::skills::branch_hygiene;

use super::{heading, summary_line, with_spinner, Context};

pub async fn run(ctx: &Context) -> Result<()> {
    let data = with_spinner("Inspecting branches...", branch_hygiene::fetch(&ctx.runner)).await?;
    println!(
        "{} {} branches (main: {})",
        "✅ Found".green(),
        data.total,
        data.main_branch.cyan()
    );

    let analysis = branch_hygiene::analyze(&data, ctx.today(), ctx.config.branches.zombie_days);
    let report = branch_hygiene::render(&analysis, ctx.generated_at);
    ctx.save(branch_hygiene::REPORT_FILE, &report.render())?;

    println!();
    heading("Branch hygiene");
    summary_line("Branches", analysis.total);
    summary_line(
        &format!("Inactive for {}+ days", analysis.zombie_days),
        analysis.zombie.len().to_string().yellow(),
    );
    summary_line("Merged", analysis.merged.len());
    summary_line("Naming issues", analysis.naming_issues.len());
    let safe = analysis.high_priority().len();
    if safe > 0 {
        println!(
            "  {} {safe} merged and inactive branches can be deleted safely",
            "→".cyan()
        );
    }
    Ok(())
}
