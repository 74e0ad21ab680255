use anyhow::Result;
use colored::Colorize;
use skillsets_core::skills::complexity;

use super::{heading, summary_line, with_spinner, Context};

pub async fn run(ctx: &Context) -> Result<()> {
    let data = with_spinner(
        "Measuring complexity...",
        complexity::fetch(&ctx.runner, ctx.config.complexity.ccn_threshold),
    )
    .await?;

    let analysis = data.as_ref().map(complexity::analyze);
    let report = complexity::render(analysis.as_ref(), ctx.generated_at);
    ctx.save(complexity::REPORT_FILE, &report.render())?;

    println!();
    heading("Complexity");
    match &analysis {
        Some(a) => {
            summary_line("Tool", a.tool.as_str());
            summary_line("Functions", a.functions.len());
            summary_line("Average", format!("{:.1}", a.average));
            summary_line("Maximum", a.max);
            summary_line(
                "Refactoring candidates",
                a.refactor_priorities().len().to_string().yellow(),
            );
        }
        None => println!(
            "  {}",
            "No analyzer available; install radon (pip install radon) or lizard (pip install lizard)"
                .yellow()
        ),
    }
    Ok(())
}
