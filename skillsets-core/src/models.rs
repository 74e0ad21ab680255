use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Other,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ChangeStatus::Added => "added",
            ChangeStatus::Modified => "modified",
            ChangeStatus::Deleted => "deleted",
            ChangeStatus::Renamed => "renamed",
            ChangeStatus::Copied => "copied",
            ChangeStatus::Other => "other",
        }
    }

    /// Parses the status column of `git log --name-status` (`A`, `M`, `R100`, ...).
    pub fn from_letter(s: &str) -> Self {
        match s.chars().next() {
            Some('A') => ChangeStatus::Added,
            Some('M') => ChangeStatus::Modified,
            Some('D') => ChangeStatus::Deleted,
            Some('R') => ChangeStatus::Renamed,
            Some('C') => ChangeStatus::Copied,
            _ => ChangeStatus::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeRecord {
    pub path: String,
    pub status: ChangeStatus,
    pub commit: String,
}

impl FileChangeRecord {
    pub fn new(path: impl Into<String>, status: ChangeStatus, commit: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status,
            commit: commit.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub author: String,
    pub timestamp: DateTime<FixedOffset>,
    pub message: String,
    pub files: Vec<FileChangeRecord>,
}

impl CommitRecord {
    pub fn new(
        hash: impl Into<String>,
        author: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            hash: hash.into(),
            author: author.into(),
            timestamp,
            message: message.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, path: impl Into<String>, status: ChangeStatus) -> Self {
        let change = FileChangeRecord::new(path, status, self.hash.clone());
        self.files.push(change);
        self
    }

    pub fn short_hash(&self) -> &str {
        let end = self
            .hash
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.hash.len());
        &self.hash[..end]
    }
}

/// A titled block of report text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSection {
    pub title: String,
    pub lines: Vec<String>,
}

impl ReportSection {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    pub fn line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_from_letter() {
        assert_eq!(ChangeStatus::from_letter("A"), ChangeStatus::Added);
        assert_eq!(ChangeStatus::from_letter("R087"), ChangeStatus::Renamed);
        assert_eq!(ChangeStatus::from_letter("C100"), ChangeStatus::Copied);
        assert_eq!(ChangeStatus::from_letter("T"), ChangeStatus::Other);
        assert_eq!(ChangeStatus::from_letter(""), ChangeStatus::Other);
    }

    #[test]
    fn test_commit_creation() {
        let ts = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 1, 10, 0, 0)
            .unwrap();
        let commit = CommitRecord::new("0123456789abcdef", "alice", ts, "feat: init")
            .with_file("src/main.rs", ChangeStatus::Added);

        assert_eq!(commit.short_hash(), "01234567");
        assert_eq!(commit.files.len(), 1);
        assert_eq!(commit.files[0].commit, "0123456789abcdef");
    }

    #[test]
    fn test_short_hash_of_short_input() {
        let ts = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 1, 10, 0, 0)
            .unwrap();
        let commit = CommitRecord::new("abc", "bob", ts, "x");
        assert_eq!(commit.short_hash(), "abc");
    }
}
