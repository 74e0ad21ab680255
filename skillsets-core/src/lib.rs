//! # skillsets-core
//!
//! Core library for skillsets - repository analysis reports built from git
//! history, source trees and external tool output.
//!
//! Every skill lives under [`skills`] and is driven through a
//! [`CommandRunner`], so external processes can be scripted in tests.

pub mod config;
pub mod conventional;
pub mod error;
pub mod git;
pub mod models;
pub mod paths;
pub mod pysource;
pub mod report;
pub mod runner;
pub mod skills;

pub use config::{load_config, load_config_from, Config};
pub use error::{Error, Result};
pub use models::{ChangeStatus, CommitRecord, FileChangeRecord, ReportSection};
pub use report::{write_report, Report};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
pub use skills::Skill;
