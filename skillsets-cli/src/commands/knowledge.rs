use anyhow::Result;
use colored::Colorize;
use skillsets_core::skills::knowledge_map::{self, RiskLevel};

use super::{heading, summary_line, with_spinner, Context};

pub async fn run(ctx: &Context) -> Result<()> {
    let commits = with_spinner("Reading authorship history...", knowledge_map::fetch(&ctx.runner))
        .await?;
    println!("{} {} commits", "✅ Loaded".green(), commits.len());

    let map = knowledge_map::analyze(&commits);
    let report = knowledge_map::render(&map, ctx.generated_at);
    ctx.save(knowledge_map::REPORT_FILE, &report.render())?;
    ctx.save(knowledge_map::DOT_FILE, &knowledge_map::to_dot(&map))?;

    let risks = map.risk_counts();
    let count = |level: RiskLevel| risks.get(&level).copied().unwrap_or(0);
    println!();
    heading("Knowledge map");
    summary_line("Contributors", map.by_author.len());
    summary_line("Files", map.ownership.len());
    summary_line(
        "Single-owner files",
        count(RiskLevel::Critical).to_string().red(),
    );
    summary_line("Two-owner files", count(RiskLevel::High).to_string().yellow());
    summary_line("Shared-knowledge pairs", map.relationships.len());
    println!(
        "  {} render the graph with: dot -Tpng {} -o knowledge_graph.png",
        "→".cyan(),
        knowledge_map::DOT_FILE
    );
    Ok(())
}
