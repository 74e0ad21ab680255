use anyhow::Result;
use colored::Colorize;
use skillsets_core::skills::time_tracker;
use skillsets_core::skills::WEEKDAYS;

use super::{heading, summary_line, with_spinner, Context};

pub async fn run(ctx: &Context) -> Result<()> {
    let commits = with_spinner("Reading commit times...", time_tracker::fetch(&ctx.runner)).await?;
    println!("{} {} commits", "✅ Loaded".green(), commits.len());

    let stats = time_tracker::analyze(&commits)?;
    let report = time_tracker::render(&stats, ctx.generated_at);
    ctx.save(time_tracker::REPORT_FILE, &report.render())?;

    let (day, day_count) = stats.busiest_day();
    let (hour, hour_count) = stats.busiest_hour();
    println!();
    heading("Coding time");
    summary_line("Commits", stats.total);
    summary_line("Workdays", stats.workday());
    summary_line("Weekend", stats.weekend());
    summary_line("Busiest hour", format!("{hour:02}:00-{hour:02}:59 ({hour_count})"));
    summary_line("Busiest weekday", format!("{} ({day_count})", WEEKDAYS[day]));
    Ok(())
}
