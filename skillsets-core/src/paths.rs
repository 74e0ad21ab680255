//! Path classification and source-tree walking.

use once_cell::sync::Lazy;
use regex::RegexSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Vendored, generated and lock-file paths that say nothing about the code.
pub const EXCLUDE_PATTERNS: &[&str] = &[
    r"node_modules/",
    r"vendor/",
    r"\.git/",
    r"dist/",
    r"build/",
    r"\.venv/",
    r"venv/",
    r"__pycache__/",
    r"\.pyc$",
    r"\.min\.js$",
    r"\.min\.css$",
    r"package-lock\.json",
    r"yarn\.lock",
    r"Pods/",
    r"\.xcodeproj/",
    r"\.xcworkspace/",
    r"DerivedData/",
];

const NON_CODE_PATTERNS: &[&str] = &[r"\.md$", r"\.txt$", r"\.json$", r"\.yaml$", r"\.yml$"];

static EXCLUDED: Lazy<RegexSet> = Lazy::new(|| RegexSet::new(EXCLUDE_PATTERNS).unwrap());

static NON_CODE: Lazy<RegexSet> = Lazy::new(|| RegexSet::new(NON_CODE_PATTERNS).unwrap());

pub fn is_excluded(path: &str) -> bool {
    EXCLUDED.is_match(path)
}

/// [`is_excluded`] plus documentation and data files.
pub fn is_excluded_non_code(path: &str) -> bool {
    is_excluded(path) || NON_CODE.is_match(path)
}

pub fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Module a path belongs to: its first directory once a leading `src/`,
/// `lib/` or `app/` is dropped, otherwise a coarse bucket by extension.
pub fn extract_module(path: &str) -> String {
    let mut rest = path;
    loop {
        match ["src/", "lib/", "app/"]
            .iter()
            .find_map(|prefix| rest.strip_prefix(prefix))
        {
            Some(stripped) => rest = stripped,
            None => break,
        }
    }

    if let Some((first, _)) = rest.split_once('/') {
        return first.to_string();
    }

    let bucket = match extension(path) {
        Some("py" | "js" | "ts" | "java" | "go" | "rs") => "code",
        Some("md" | "txt" | "rst") => "docs",
        Some("yml" | "yaml" | "json" | "toml" | "ini") => "config",
        Some("css" | "scss" | "less" | "html" | "jsx" | "tsx") => "frontend",
        _ => "other",
    };
    bucket.to_string()
}

/// Files under `root` with one of `extensions`, skipping any directory whose
/// name is in `skip_dirs`. Results are sorted for stable reports.
pub fn source_files(root: &Path, extensions: &[&str], skip_dirs: &[&str]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !skip_dirs.contains(&name.as_ref())
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.contains(&e))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// `path` relative to `root`, with `/` separators.
pub fn relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
