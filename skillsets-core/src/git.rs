//! Git invocation helpers and log parsing.
//!
//! Every skill reads history through the same pretty format, [`LOG_FORMAT`],
//! optionally followed by `--name-status` or `--name-only` file lines, so a
//! single parser covers all of them.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ChangeStatus, CommitRecord, FileChangeRecord};
use crate::runner::CommandRunner;

/// Header line of every log listing: hash, author, strict ISO date, subject.
pub const LOG_FORMAT: &str = "--pretty=format:%H|%an|%aI|%s";

static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{40,64}\|").unwrap());

/// Fails with [`Error::NotARepository`] unless the runner's directory is inside a work tree.
pub async fn ensure_repo(runner: &dyn CommandRunner) -> Result<()> {
    let output = runner
        .run("git", &["rev-parse", "--is-inside-work-tree"])
        .await?;

    if !output.success || output.stdout.trim() != "true" {
        return Err(Error::NotARepository(
            runner.working_dir().display().to_string(),
        ));
    }

    Ok(())
}

/// False on an unborn branch, where `HEAD` does not resolve yet.
pub async fn has_commits(runner: &dyn CommandRunner) -> Result<bool> {
    let output = runner
        .run("git", &["rev-parse", "--verify", "--quiet", "HEAD"])
        .await?;
    Ok(output.success)
}

pub async fn toplevel(runner: &dyn CommandRunner) -> Result<PathBuf> {
    let out = runner
        .run_checked("git", &["rev-parse", "--show-toplevel"])
        .await?;
    Ok(PathBuf::from(out.trim()))
}

/// Runs `git log` with [`LOG_FORMAT`] plus `extra` arguments and parses the result.
pub async fn log(runner: &dyn CommandRunner, extra: &[&str]) -> Result<Vec<CommitRecord>> {
    let mut args = vec!["log", LOG_FORMAT];
    args.extend_from_slice(extra);

    let output = runner.run("git", &args).await?;
    if !output.success {
        // An unborn branch has no history to report on.
        if output.stderr.contains("does not have any commits") {
            return Ok(Vec::new());
        }
        return Err(Error::CommandFailed {
            command: crate::runner::command_line("git", &args),
            stderr: output.stderr.trim().to_string(),
        });
    }

    let commits = parse_log(&output.stdout);
    debug!(count = commits.len(), "Parsed git log");
    Ok(commits)
}

/// Parses a date in any of the shapes git prints: strict ISO (`%aI`),
/// `--date=iso` (`2026-01-30 19:58:09 +0800`) or a bare `YYYY-MM-DD HH:MM`,
/// which is taken as UTC.
pub fn parse_git_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt);
    }
    let utc = FixedOffset::east_opt(0)?;
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return utc.from_local_datetime(&naive).single();
        }
    }
    None
}

fn parse_header(line: &str) -> Option<CommitRecord> {
    let mut parts = line.splitn(4, '|');
    let hash = parts.next()?;
    let author = parts.next()?;
    let date = parse_git_datetime(parts.next()?)?;
    let message = parts.next().unwrap_or("");
    Some(CommitRecord::new(hash, author.trim(), date, message.trim()))
}

fn parse_file_line(line: &str, commit: &str) -> Option<FileChangeRecord> {
    if line.contains('\t') {
        let mut cols = line.split('\t');
        let status = ChangeStatus::from_letter(cols.next()?.trim());
        // Renames and copies list the old path first.
        let path = cols.last()?.trim();
        if path.is_empty() {
            return None;
        }
        Some(FileChangeRecord::new(path, status, commit))
    } else {
        Some(FileChangeRecord::new(line.trim(), ChangeStatus::Other, commit))
    }
}

/// Parses `git log` output produced with [`LOG_FORMAT`]. File lines following a
/// header are attached to that commit. Lines that fit neither shape are skipped,
/// as are headers whose date cannot be read, together with their files.
pub fn parse_log(text: &str) -> Vec<CommitRecord> {
    let mut commits: Vec<CommitRecord> = Vec::new();
    let mut in_valid_commit = false;

    for raw in text.lines() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        if HEADER_RE.is_match(line) {
            match parse_header(line) {
                Some(commit) => {
                    commits.push(commit);
                    in_valid_commit = true;
                }
                None => {
                    debug!(line, "Skipping malformed log header");
                    in_valid_commit = false;
                }
            }
            continue;
        }

        if !in_valid_commit {
            continue;
        }
        if let Some(current) = commits.last_mut() {
            if let Some(change) = parse_file_line(line, &current.hash) {
                current.files.push(change);
            }
        }
    }

    commits
}

/// `git` argument for commits newer than `days` days.
pub fn since_arg(days: i64) -> String {
    format!("--since={days} days ago")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::ScriptedRunner;
    use chrono::{Datelike, Timelike};

    const H1: &str = "1111111111111111111111111111111111111111";
    const H2: &str = "2222222222222222222222222222222222222222";

    #[test]
    fn test_parse_datetime_shapes() {
        let iso = parse_git_datetime("2026-01-30T19:58:09+08:00").unwrap();
        assert_eq!(iso.hour(), 19);
        assert_eq!(iso.offset().local_minus_utc(), 8 * 3600);

        let git_iso = parse_git_datetime("2026-01-30 19:58:09 +0800").unwrap();
        assert_eq!(git_iso, iso);

        let short = parse_git_datetime("2026-01-30 07:05").unwrap();
        assert_eq!(short.hour(), 7);
        assert_eq!(short.minute(), 5);

        assert!(parse_git_datetime("yesterday").is_none());
    }

    #[test]
    fn test_parse_plain_log() {
        let text = format!(
            "{H1}|Alice|2026-03-02T10:00:00+00:00|feat(api): add | pipes\n\
             {H2}|Bob|2026-03-01T09:00:00+00:00|fix: crash\n"
        );
        let commits = parse_log(&text);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].author, "Alice");
        assert_eq!(commits[0].message, "feat(api): add | pipes");
        assert_eq!(commits[1].timestamp.day(), 1);
        assert!(commits[0].files.is_empty());
    }

    #[test]
    fn test_parse_name_status() {
        let text = format!(
            "{H1}|Alice|2026-03-02T10:00:00+00:00|refactor\n\
             M\tsrc/lib.rs\n\
             R087\tsrc/old.rs\tsrc/new.rs\n\
             A\tREADME.md\n\
             \n\
             {H2}|Bob|2026-03-01T09:00:00+00:00|init\n\
             D\tgone.txt\n"
        );
        let commits = parse_log(&text);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].files.len(), 3);
        assert_eq!(commits[0].files[1].path, "src/new.rs");
        assert_eq!(commits[0].files[1].status, ChangeStatus::Renamed);
        assert_eq!(commits[1].files[0].status, ChangeStatus::Deleted);
        assert_eq!(commits[1].files[0].commit, H2);
    }

    #[test]
    fn test_parse_name_only() {
        let text = format!(
            "{H1}|Alice|2026-03-02T10:00:00+00:00|docs\n\
             docs/guide.md\n\
             README\n"
        );
        let commits = parse_log(&text);
        assert_eq!(commits[0].files.len(), 2);
        assert_eq!(commits[0].files[1].path, "README");
        assert_eq!(commits[0].files[1].status, ChangeStatus::Other);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let text = format!(
            "stray line before any header\n\
             {H1}|Alice|not-a-date|broken\n\
             M\tshould/be/dropped.rs\n\
             {H2}|Bob|2026-03-01T09:00:00+00:00|ok\n"
        );
        let commits = parse_log(&text);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].hash, H2);
        assert!(commits[0].files.is_empty());
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_log("").is_empty());
    }

    #[tokio::test]
    async fn test_ensure_repo() {
        let runner = ScriptedRunner::git_repo();
        assert!(ensure_repo(&runner).await.is_ok());

        let runner = ScriptedRunner::new().fail("git rev-parse", "fatal: not a git repository");
        let err = ensure_repo(&runner).await.unwrap_err();
        assert!(matches!(err, Error::NotARepository(_)));
    }

    #[tokio::test]
    async fn test_log_on_unborn_branch_is_empty() {
        let runner = ScriptedRunner::new().fail(
            "git log",
            "fatal: your current branch 'main' does not have any commits yet",
        );
        assert!(log(&runner, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_log_passes_extra_args() {
        let runner = ScriptedRunner::new().on(
            "git log",
            &format!("{H1}|Alice|2026-03-02T10:00:00+00:00|x\n"),
        );
        let commits = log(&runner, &["--no-merges"]).await.unwrap();
        assert_eq!(commits.len(), 1);
        assert!(runner.called(&format!("git log {LOG_FORMAT} --no-merges")));
    }

    #[test]
    fn test_since_arg() {
        assert_eq!(since_arg(30), "--since=30 days ago");
    }
}
