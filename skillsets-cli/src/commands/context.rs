use anyhow::Result;
use colored::Colorize;
use skillsets_core::skills::context_switch;

use super::{heading, summary_line, with_spinner, Context};

pub async fn run(ctx: &Context, days: Option<i64>) -> Result<()> {
    let settings = &ctx.config.context_switch;
    let days = days.unwrap_or(settings.days);
    let data = with_spinner(
        &format!("Reading {days} days of commits..."),
        context_switch::fetch(&ctx.runner, days),
    )
    .await?;
    if data.days != days {
        println!(
            "{}",
            format!("⚠️  No commits in {days} days, widened the window to {}", data.days).yellow()
        );
    }

    let analysis =
        context_switch::analyze(&data.commits, settings.gap_minutes, settings.focus_minutes);
    let report = context_switch::render(&analysis, ctx.generated_at);
    ctx.save(context_switch::REPORT_FILE, &report.render())?;

    let (grade, _, icon) = context_switch::fragmentation_grade(analysis.fragmentation);
    println!();
    heading("Context switching");
    summary_line("Commits", analysis.commits);
    summary_line("Switches", analysis.switches.len());
    summary_line(
        "Fragmentation",
        format!("{:.1} {icon} {grade}", analysis.fragmentation),
    );
    summary_line("Focus periods", analysis.focus_periods.len());
    summary_line(
        "Estimated recovery time",
        format!("{:.1} hours", analysis.recovery_hours()),
    );
    Ok(())
}
