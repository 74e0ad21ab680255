use anyhow::{bail, Result};
use colored::Colorize;
use skillsets_core::Skill;

use super::{branches, changelog, churn, commits, complexity, context, deps, docs, knowledge};
use super::{tasks, tests, time, Context};

async fn run_skill(ctx: &Context, skill: Skill) -> Result<()> {
    match skill {
        Skill::Commits => commits::run(ctx, None).await,
        Skill::Branches => branches::run(ctx).await,
        Skill::Changelog => changelog::run(ctx).await,
        Skill::Churn => churn::run(ctx, None).await,
        Skill::Complexity => complexity::run(ctx).await,
        Skill::Smells => super::smells::run(ctx, None, None).await,
        Skill::Context => context::run(ctx, None).await,
        Skill::Deps => deps::run(ctx).await,
        Skill::Docs => docs::run(ctx, None).await,
        Skill::Repos => super::repos::run(ctx).await,
        Skill::Knowledge => knowledge::run(ctx).await,
        Skill::Tasks => tasks::run(ctx, None).await,
        Skill::Tests => tests::run(ctx).await,
        Skill::Time => time::run(ctx).await,
    }
}

/// Runs every skill that only needs the local checkout, carrying on after
/// failures and failing at the end if any skill did.
pub async fn run(ctx: &Context) -> Result<()> {
    let skills: Vec<Skill> = Skill::ALL
        .into_iter()
        .filter(|s| !s.needs_network())
        .collect();
    let mut failed = Vec::new();

    for (i, skill) in skills.iter().enumerate() {
        println!();
        println!(
            "{}",
            format!("[{}/{}] {}", i + 1, skills.len(), skill.name())
                .bold()
                .cyan()
        );
        if let Err(err) = run_skill(ctx, *skill).await {
            tracing::warn!(skill = skill.name(), error = %err, "Skill failed");
            eprintln!("{} {}: {err:#}", "✗".red().bold(), skill.name());
            failed.push(skill.name());
        }
    }

    println!();
    println!(
        "{} {}/{} skills completed, reports in {}",
        "Done:".bold(),
        skills.len() - failed.len(),
        skills.len(),
        ctx.output_dir.display()
    );
    if !failed.is_empty() {
        bail!("{} skill(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}
