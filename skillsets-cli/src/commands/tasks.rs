use anyhow::Result;
use colored::Colorize;
use skillsets_core::skills::task_completion;

use super::{heading, summary_line, with_spinner, Context};

pub async fn run(ctx: &Context, days: Option<i64>) -> Result<()> {
    let days = days.unwrap_or(ctx.config.tasks.days);
    let commits = with_spinner(
        &format!("Reading {days} days of commits..."),
        task_completion::fetch(&ctx.runner, days),
    )
    .await?;
    if commits.is_empty() {
        println!(
            "{}",
            format!("⚠️  No commits in the last {days} days").yellow()
        );
    }

    let stats = task_completion::analyze(&commits);
    let report = task_completion::render(&stats, days, ctx.generated_at);
    ctx.save(task_completion::REPORT_FILE, &report.render())?;

    println!();
    heading("Task completion");
    summary_line("Window", format!("last {days} days"));
    summary_line("Tasks", stats.total);
    if stats.total > 0 {
        summary_line("Features", stats.count("feat"));
        summary_line("Bug fixes", stats.count("fix"));
        summary_line("Weekly average", format!("{:.1}", stats.weekly_average()));
    }
    Ok(())
}
