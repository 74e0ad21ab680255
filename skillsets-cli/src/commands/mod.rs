pub mod all;
pub mod branches;
pub mod changelog;
pub mod churn;
pub mod commits;
pub mod complexity;
pub mod context;
pub mod deps;
pub mod docs;
pub mod knowledge;
pub mod list;
pub mod repos;
pub mod smells;
pub mod tasks;
pub mod tests;
pub mod time;

use anyhow::{Context as _, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use skillsets_core::{load_config, load_config_from, write_report, Config, SystemRunner};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything a command needs: resolved directories, configuration and the
/// process runner rooted at the repository.
pub struct Context {
    pub dir: PathBuf,
    pub config: Config,
    pub output_dir: PathBuf,
    pub generated_at: Option<NaiveDateTime>,
    pub runner: SystemRunner,
}

impl Context {
    pub fn load(dir: PathBuf, config: Option<PathBuf>, output_dir: Option<PathBuf>) -> Result<Self> {
        let dir = std::fs::canonicalize(&dir)
            .with_context(|| format!("Cannot open directory {}", dir.display()))?;

        let config = match config {
            Some(path) => load_config_from(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => load_config(&dir).context("Failed to load .skillsets.toml")?,
        };

        let output_dir = output_dir.unwrap_or_else(|| resolve(&dir, &config.report.output_dir));
        let generated_at = config
            .report
            .timestamp
            .then(|| Local::now().naive_local());
        let runner = SystemRunner::new(&dir).with_timeout(config.commands.timeout());

        Ok(Self {
            dir,
            config,
            output_dir,
            generated_at,
            runner,
        })
    }

    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    /// A directory given on the command line, relative to the repository;
    /// the repository itself when absent.
    pub fn scan_root(&self, path: Option<PathBuf>) -> PathBuf {
        match path {
            Some(path) => resolve(&self.dir, &path),
            None => self.dir.clone(),
        }
    }

    /// Writes a report file and announces where it went.
    pub fn save(&self, file_name: &str, content: &str) -> Result<PathBuf> {
        let path = write_report(&self.output_dir, file_name, content)
            .with_context(|| format!("Failed to write {file_name}"))?;
        println!("{} {}", "✅ Report saved to".green(), path.display());
        Ok(path)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Awaits `work` behind a spinner that is cleared once it settles.
pub async fn with_spinner<T>(
    message: &str,
    work: impl Future<Output = skillsets_core::Result<T>>,
) -> Result<T> {
    let pb = spinner(message);
    let result = work.await;
    pb.finish_and_clear();
    Ok(result?)
}

pub fn heading(title: &str) {
    println!("{}", title.bold().cyan());
}

pub fn summary_line(label: &str, value: impl std::fmt::Display) {
    println!("  {}: {}", label.bold(), value);
}

#[cfg(test)]
mod context_tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_output_to_repository() {
        let dir = TempDir::new().unwrap();
        let ctx = Context::load(dir.path().to_path_buf(), None, None).unwrap();
        assert_eq!(ctx.output_dir, ctx.dir.join("."));
        assert!(ctx.generated_at.is_some());
    }

    #[test]
    fn test_load_reads_config_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".skillsets.toml"),
            "[report]\noutput_dir = \"reports\"\ntimestamp = false\n\n[churn]\ndays = 7\n",
        )
        .unwrap();

        let ctx = Context::load(dir.path().to_path_buf(), None, None).unwrap();
        assert_eq!(ctx.output_dir, ctx.dir.join("reports"));
        assert!(ctx.generated_at.is_none());
        assert_eq!(ctx.config.churn.days, 7);

        let path = ctx.save("x.txt", "hello").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }

    #[test]
    fn test_scan_root_is_relative_to_repository() {
        let dir = TempDir::new().unwrap();
        let ctx = Context::load(dir.path().to_path_buf(), None, None).unwrap();
        assert_eq!(ctx.scan_root(None), ctx.dir);
        assert_eq!(ctx.scan_root(Some(PathBuf::from("src"))), ctx.dir.join("src"));
        assert_eq!(
            ctx.scan_root(Some(PathBuf::from("/opt/project"))),
            PathBuf::from("/opt/project")
        );
    }

    #[test]
    fn test_missing_directory_is_error() {
        let err = Context::load(PathBuf::from("/definitely/not/here"), None, None)
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("Cannot open directory"));
    }
}
