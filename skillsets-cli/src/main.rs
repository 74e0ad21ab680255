use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    all, branches, changelog, churn, commits, complexity, context, deps, docs, knowledge, list,
    repos, smells, tasks, tests, time, Context,
};

#[derive(Parser)]
#[command(name = "skillsets")]
#[command(version, about = "Analysis reports for git repositories and GitHub accounts", long_about = None)]
struct Cli {
    /// Repository to analyze
    #[arg(short = 'C', long = "dir", global = true, default_value = ".")]
    dir: PathBuf,

    /// Config file (defaults to .skillsets.toml in the repository)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for report files
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Commit statistics, contributors and message quality
    Commits {
        /// Only analyze the most recent N commits
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Stale, merged and badly named branches
    Branches,

    /// Generate CHANGELOG.md from conventional commits
    Changelog,

    /// Frequently changed files and stability scores
    Churn {
        /// Days of history to analyze
        #[arg(short, long)]
        days: Option<i64>,
    },

    /// Cyclomatic complexity via radon or lizard
    Complexity,

    /// Code smells in Python and JavaScript sources
    Smells {
        /// Project directory to scan (defaults to --dir)
        #[arg(short, long)]
        project_dir: Option<PathBuf>,

        /// Report file name
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Context switches between modules and focus periods
    Context {
        /// Days of history to analyze
        #[arg(short, long)]
        days: Option<i64>,
    },

    /// Vulnerable, outdated and risky-licence dependencies
    Deps,

    /// Documentation coverage with quality grading
    Docs {
        /// Directory to scan (defaults to --dir)
        path: Option<PathBuf>,
    },

    /// GitHub repositories overview and cleanup candidates
    Repos,

    /// File ownership, bus factor and knowledge graph
    Knowledge,

    /// Completed work by commit type and velocity
    Tasks {
        /// Days of history to analyze
        #[arg(short, long)]
        days: Option<i64>,
    },

    /// Test coverage from coverage.py or istanbul data
    Tests,

    /// When work happens: hours, weekdays and periods
    Time,

    /// List every skill and its report file
    List,

    /// Run every local skill
    All,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    if let Commands::List = cli.command {
        list::run();
        return Ok(());
    }

    let ctx = Context::load(cli.dir, cli.config, cli.output_dir)?;

    match cli.command {
        Commands::Commits { limit } => commits::run(&ctx, limit).await,
        Commands::Branches => branches::run(&ctx).await,
        Commands::Changelog => changelog::run(&ctx).await,
        Commands::Churn { days } => churn::run(&ctx, days).await,
        Commands::Complexity => complexity::run(&ctx).await,
        Commands::Smells {
            project_dir,
            output,
        } => smells::run(&ctx, project_dir, output).await,
        Commands::Context { days } => context::run(&ctx, days).await,
        Commands::Deps => deps::run(&ctx).await,
        Commands::Docs { path } => docs::run(&ctx, path).await,
        Commands::Repos => repos::run(&ctx).await,
        Commands::Knowledge => knowledge::run(&ctx).await,
        Commands::Tasks { days } => tasks::run(&ctx, days).await,
        Commands::Tests => tests::run(&ctx).await,
        Commands::Time => time::run(&ctx).await,
        Commands::All => all::run(&ctx).await,
        Commands::List => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = dispatch(cli).await {
        eprintln!("{} {err:#}", "Error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["skillsets", "churn", "--days", "30", "-C", "/tmp/repo", "-vv"])
            .unwrap();
        assert_eq!(cli.dir, PathBuf::from("/tmp/repo"));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Churn { days: Some(30) }));
    }

    #[test]
    fn test_smells_flags() {
        let cli = Cli::try_parse_from(["skillsets", "smells", "-p", "src", "-o", "smells.txt"]).unwrap();
        match cli.command {
            Commands::Smells {
                project_dir,
                output,
            } => {
                assert_eq!(project_dir, Some(PathBuf::from("src")));
                assert_eq!(output.as_deref(), Some("smells.txt"));
            }
            _ => panic!("expected smells"),
        }
    }
}
