//! Skills driven through [`SystemRunner`] against a scratch git repository.
//! Skipped when `git` is not installed.

use std::path::Path;
use tempfile::TempDir;

use crate::error::Error;
use crate::git;
use crate::runner::{CommandRunner, SystemRunner};
use crate::skills::changelog::Category;
use crate::skills::{
    branch_hygiene, changelog, churn, code_smells, commit_analyzer, context_switch, doc_coverage,
    knowledge_map, task_completion, time_tracker,
};

async fn git_available(runner: &SystemRunner) -> bool {
    matches!(runner.run("git", &["--version"]).await, Ok(out) if out.success)
}

async fn run_git(runner: &SystemRunner, args: &[&str]) {
    runner.run_checked("git", args).await.unwrap();
}

async fn commit(runner: &SystemRunner, message: &str) {
    run_git(runner, &["add", "-A"]).await;
    run_git(
        runner,
        &[
            "-c",
            "user.name=Dev",
            "-c",
            "user.email=dev@example.com",
            "-c",
            "commit.gpgsign=false",
            "commit",
            "-q",
            "-m",
            message,
        ],
    )
    .await;
}

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

async fn init(dir: &TempDir) -> Option<SystemRunner> {
    let runner = SystemRunner::new(dir.path());
    if !git_available(&runner).await {
        return None;
    }
    run_git(&runner, &["init", "-q"]).await;
    run_git(&runner, &["symbolic-ref", "HEAD", "refs/heads/main"]).await;
    Some(runner)
}

#[tokio::test]
async fn test_unborn_branch() {
    let dir = TempDir::new().unwrap();
    let Some(runner) = init(&dir).await else {
        return;
    };

    assert!(!git::has_commits(&runner).await.unwrap());

    let log = changelog::fetch(&runner).await.unwrap();
    assert!(log.tags.is_empty());
    assert!(log.to_markdown().contains("## [All Commits] - Unreleased"));

    assert!(commit_analyzer::fetch(&runner, None).await.unwrap().is_empty());
    assert!(matches!(
        time_tracker::fetch(&runner).await,
        Err(Error::NoData(_))
    ));
}

#[tokio::test]
async fn test_skills_on_repository() {
    let dir = TempDir::new().unwrap();
    let Some(runner) = init(&dir).await else {
        return;
    };
    let root = dir.path();

    write(root, "src/api/a.py", "def handler():\n    return 1\n");
    write(root, "docs/guide.md", "# Guide\n");
    commit(&runner, "feat: add api handler").await;
    run_git(&runner, &["tag", "v0.1.0"]).await;

    write(
        root,
        "src/api/a.py",
        "def handler():\n    \"\"\"Handle a request.\"\"\"\n    return 2\n",
    );
    commit(&runner, "fix(api): handle empty body").await;
    run_git(&runner, &["branch", "feature/login"]).await;

    assert!(git::has_commits(&runner).await.unwrap());

    let commits = commit_analyzer::fetch(&runner, None).await.unwrap();
    assert_eq!(commits.len(), 2);
    assert!(commits.iter().all(|c| c.author == "Dev" && c.hash.len() == 40));
    let analysis = commit_analyzer::analyze(&commits);
    assert!(!commit_analyzer::render(&analysis, None).render().is_empty());

    let branches = branch_hygiene::fetch(&runner).await.unwrap();
    assert_eq!(branches.main_branch, "main");
    let login = branches
        .branches
        .iter()
        .find(|b| b.name == "feature/login")
        .unwrap();
    assert!(login.merged);
    assert!(login.last_commit.is_some());

    let log = changelog::fetch(&runner).await.unwrap();
    assert_eq!(log.tags, vec!["v0.1.0"]);
    assert_eq!(log.releases.len(), 1);
    assert_eq!(log.releases[0].entries[0].category, Category::Added);
    assert_eq!(log.unreleased.len(), 1);
    assert_eq!(log.unreleased[0].category, Category::Fixed);

    let data = churn::fetch(&runner, 30).await.unwrap();
    let analysis = churn::analyze(&data.commits, 30, churn::size_on_disk(&data.root));
    let handler = analysis
        .files
        .iter()
        .find(|f| f.path == "src/api/a.py")
        .unwrap();
    assert_eq!(handler.commits, 2);
    assert_eq!(handler.additions, 1);
    assert_eq!(handler.modifications, 1);
    assert!(!churn::render(&analysis, None).render().is_empty());

    let data = context_switch::fetch(&runner, 30).await.unwrap();
    assert_eq!(data.days, 30);
    assert_eq!(data.commits.len(), 2);
    let analysis = context_switch::analyze(&data.commits, 30, 45);
    assert!(!context_switch::render(&analysis, None).render().is_empty());

    let history = knowledge_map::fetch(&runner).await.unwrap();
    let map = knowledge_map::analyze(&history);
    let owner = map
        .ownership
        .iter()
        .find(|o| o.path == "src/api/a.py")
        .unwrap();
    assert_eq!(owner.primary_owner, "Dev");
    assert!(!knowledge_map::render(&map, None).render().is_empty());

    let recent = task_completion::fetch(&runner, 30).await.unwrap();
    let stats = task_completion::analyze(&recent);
    assert_eq!(stats.total, 2);
    assert!(!task_completion::render(&stats, 30, None).render().is_empty());

    let all = time_tracker::fetch(&runner).await.unwrap();
    let times = time_tracker::analyze(&all).unwrap();
    assert_eq!(times.total, 2);
    assert!(!time_tracker::render(&times, None).render().is_empty());

    let smells = code_smells::scan(root).unwrap();
    assert!(!code_smells::render(&smells, None).render().is_empty());
    let docs = doc_coverage::scan(root).unwrap();
    assert!(!doc_coverage::render(&docs, None).render().is_empty());
}
