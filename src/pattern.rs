//! Pattern file loading.
//!
//! Spider rules live in plain text files, one pattern per line. Lines
//! starting with `#` are comments and blank lines are ignored.

use regex::Regex;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// The three rule file sets kept under the spiders directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// IPv4 addresses, subnets, ranges and hostnames
    Ips,
    /// User-Agent regular expressions
    Agents,
    /// Reverse hostname regular expressions
    Domains,
}

impl PatternKind {
    /// Get the directory holding this kind of pattern file.
    pub fn dir(&self, spiders_dir: &Path) -> PathBuf {
        match self {
            PatternKind::Ips => spiders_dir.to_path_buf(),
            PatternKind::Agents => spiders_dir.join("agents"),
            PatternKind::Domains => spiders_dir.join("domains"),
        }
    }

    /// Get the name used in log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Ips => "ip",
            PatternKind::Agents => "agent",
            PatternKind::Domains => "domain",
        }
    }
}

/// Read the patterns held in one file.
///
/// A path that does not exist or is not a regular file yields an empty set.
pub fn read_patterns(path: impl AsRef<Path>) -> io::Result<BTreeSet<String>> {
    let path = path.as_ref();
    let mut patterns = BTreeSet::new();

    if !path.is_file() {
        return Ok(patterns);
    }

    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        patterns.insert(line.to_string());
    }

    Ok(patterns)
}

/// Read the patterns from every file directly inside `dir`.
///
/// Files are visited in name order. Unreadable files are logged and skipped,
/// a missing directory yields an empty list.
pub fn load_patterns_from_directory(dir: impl AsRef<Path>, lowercase: bool) -> Vec<String> {
    let dir = dir.as_ref();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::info!("No spider pattern directory at {:?}: {}", dir, e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut patterns = Vec::new();
    for file in files {
        match read_patterns(&file) {
            Ok(set) => {
                log::debug!("Read {} patterns from {:?}", set.len(), file);
                patterns.extend(set.into_iter().map(|p| {
                    if lowercase {
                        p.to_lowercase()
                    } else {
                        p
                    }
                }));
            }
            Err(e) => {
                log::warn!("Skipping unreadable pattern file {:?}: {}", file, e);
            }
        }
    }

    patterns
}

/// Compile regex patterns, dropping any that are empty or invalid.
pub fn compile_patterns<I, S>(patterns: I) -> Vec<Regex>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .filter_map(|pattern| {
            let pattern = pattern.as_ref();
            if pattern.is_empty() {
                return None;
            }
            match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    log::warn!("Skipping invalid spider pattern {:?}: {}", pattern, e);
                    None
                }
            }
        })
        .collect()
}
