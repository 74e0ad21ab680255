use anyhow::Result;
use colored::Colorize;
use skillsets_core::skills::changelog;

use super::{heading, summary_line, with_spinner, Context};

pub async fn run(ctx: &Context) -> Result<()> {
    let log = with_spinner("Collecting tags and commits...", changelog::fetch(&ctx.runner)).await?;
    if log.tags.is_empty() {
        println!(
            "{}",
            "⚠️  No version tags found; listing every commit".yellow()
        );
    }

    ctx.save(changelog::REPORT_FILE, &log.to_markdown())?;

    println!();
    heading("Changelog");
    summary_line("Tags", log.tags.len());
    summary_line("Releases", log.releases.len());
    summary_line("Unreleased changes", log.unreleased.len());
    for (category, count) in log.unreleased_counts() {
        println!("    {}: {count}", category.as_str());
    }
    Ok(())
}
