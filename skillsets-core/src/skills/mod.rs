//! One module per skill. Each follows the same shape: an async `fetch` that
//! shells out through a [`CommandRunner`](crate::runner::CommandRunner) (or a
//! `scan` that walks the tree), a pure `analyze`, and a `render` producing a
//! [`Report`](crate::report::Report).

pub mod branch_hygiene;
pub mod changelog;
pub mod churn;
pub mod code_smells;
pub mod commit_analyzer;
pub mod complexity;
pub mod context_switch;
pub mod dependency_audit;
pub mod doc_coverage;
pub mod knowledge_map;
pub mod repo_analyzer;
pub mod task_completion;
pub mod test_coverage;
pub mod time_tracker;

#[cfg(test)]
mod repository_tests;

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Skill {
    Commits,
    Branches,
    Changelog,
    Churn,
    Complexity,
    Smells,
    Context,
    Deps,
    Docs,
    Repos,
    Knowledge,
    Tasks,
    Tests,
    Time,
}

impl Skill {
    pub const ALL: [Skill; 14] = [
        Skill::Commits,
        Skill::Branches,
        Skill::Changelog,
        Skill::Churn,
        Skill::Complexity,
        Skill::Smells,
        Skill::Context,
        Skill::Deps,
        Skill::Docs,
        Skill::Repos,
        Skill::Knowledge,
        Skill::Tasks,
        Skill::Tests,
        Skill::Time,
    ];

    /// Subcommand name.
    pub fn name(&self) -> &'static str {
        match self {
            Skill::Commits => "commits",
            Skill::Branches => "branches",
            Skill::Changelog => "changelog",
            Skill::Churn => "churn",
            Skill::Complexity => "complexity",
            Skill::Smells => "smells",
            Skill::Context => "context",
            Skill::Deps => "deps",
            Skill::Docs => "docs",
            Skill::Repos => "repos",
            Skill::Knowledge => "knowledge",
            Skill::Tasks => "tasks",
            Skill::Tests => "tests",
            Skill::Time => "time",
        }
    }

    pub fn report_file(&self) -> &'static str {
        match self {
            Skill::Commits => commit_analyzer::REPORT_FILE,
            Skill::Branches => branch_hygiene::REPORT_FILE,
            Skill::Changelog => changelog::REPORT_FILE,
            Skill::Churn => churn::REPORT_FILE,
            Skill::Complexity => complexity::REPORT_FILE,
            Skill::Smells => code_smells::REPORT_FILE,
            Skill::Context => context_switch::REPORT_FILE,
            Skill::Deps => dependency_audit::REPORT_FILE,
            Skill::Docs => doc_coverage::REPORT_FILE,
            Skill::Repos => repo_analyzer::REPORT_FILE,
            Skill::Knowledge => knowledge_map::REPORT_FILE,
            Skill::Tasks => task_completion::REPORT_FILE,
            Skill::Tests => test_coverage::REPORT_FILE,
            Skill::Time => time_tracker::REPORT_FILE,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Skill::Commits => "Commit statistics, contributors, activity heatmaps and message quality",
            Skill::Branches => "Stale, merged and badly named branches with cleanup commands",
            Skill::Changelog => "Keep a Changelog file generated from conventional commits",
            Skill::Churn => "Frequently changed files, stability scores and risk hot spots",
            Skill::Complexity => "Cyclomatic complexity map via radon or lizard",
            Skill::Smells => "Code smells in Python and JavaScript sources",
            Skill::Context => "Context switches between modules and focus periods",
            Skill::Deps => "Vulnerable, outdated and risky-licence dependencies",
            Skill::Docs => "Docstring and JSDoc coverage with quality grading",
            Skill::Repos => "GitHub repositories overview and cleanup candidates",
            Skill::Knowledge => "File ownership, bus factor and knowledge graph",
            Skill::Tasks => "Completed work by commit type, velocity and trends",
            Skill::Tests => "Test coverage from coverage.py or istanbul data",
            Skill::Time => "When work happens: hours, weekdays and periods",
        }
    }

    /// Skills that talk to a remote service rather than the local checkout.
    pub fn needs_network(&self) -> bool {
        matches!(self, Skill::Repos)
    }

    pub fn from_name(name: &str) -> Option<Skill> {
        Skill::ALL.iter().copied().find(|s| s.name() == name)
    }
}

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Counts sorted by descending value, ties broken by key.
pub(crate) fn ranked<K: Ord + Clone + Hash>(counts: &HashMap<K, usize>) -> Vec<(K, usize)> {
    let mut items: Vec<(K, usize)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_names_are_unique() {
        for skill in Skill::ALL {
            assert_eq!(Skill::from_name(skill.name()), Some(skill));
        }
        let mut files: Vec<&str> = Skill::ALL.iter().map(|s| s.report_file()).collect();
        files.sort();
        files.dedup();
        assert_eq!(files.len(), Skill::ALL.len());
    }

    #[test]
    fn test_ranked_breaks_ties_by_key() {
        let counts = HashMap::from([("b", 2), ("a", 2), ("c", 5)]);
        assert_eq!(ranked(&counts), vec![("c", 5), ("a", 2), ("b", 2)]);
    }
}
