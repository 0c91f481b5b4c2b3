// Copyright (c) 2024 Mike Tsao. All rights reserved.

//! Finding audio files on disk and putting them in a human-friendly order.

use regex::Regex;
use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
    sync::OnceLock,
};
use walkdir::WalkDir;

/// One piece of a [NaturalSortKey]: either a run of text (lowercased) or a run
/// of digits (compared as an integer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortPart {
    #[allow(missing_docs)]
    Text(String),
    #[allow(missing_docs)]
    Number(u128),
}
impl PartialOrd for SortPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for SortPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortPart::Text(a), SortPart::Text(b)) => a.cmp(b),
            (SortPart::Number(a), SortPart::Number(b)) => a.cmp(b),
            // Keys always alternate text, number, text, ..., so parts at the
            // same position are the same kind. This arm just keeps Ord total.
            (SortPart::Number(_), SortPart::Text(_)) => Ordering::Less,
            (SortPart::Text(_), SortPart::Number(_)) => Ordering::Greater,
        }
    }
}

/// A sort key that orders `note2` before `note10`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct NaturalSortKey(Vec<SortPart>);
impl NaturalSortKey {
    /// Splits `s` into alternating text and numeric parts. The first part is
    /// always text, possibly empty.
    pub fn new(s: &str) -> Self {
        static DIGITS: OnceLock<Regex> = OnceLock::new();
        let digits = DIGITS.get_or_init(|| Regex::new("[0-9]+").expect("valid regex"));

        let mut parts = Vec::default();
        let mut last = 0;
        for m in digits.find_iter(s) {
            parts.push(SortPart::Text(s[last..m.start()].to_lowercase()));
            parts.push(SortPart::Number(m.as_str().parse().unwrap_or(u128::MAX)));
            last = m.end();
        }
        parts.push(SortPart::Text(s[last..].to_lowercase()));
        Self(parts)
    }
}

/// Sorts paths by the natural order of their file names.
pub fn natural_sort(paths: &mut [PathBuf]) {
    paths.sort_by_cached_key(|p| NaturalSortKey::new(&file_name(p)));
}

/// A shell-style file pattern such as `*.wav`. `*` matches any run of
/// characters and `?` matches exactly one. Matching ignores case. As in a
/// shell, hidden files (a leading `.`) only match a pattern that starts with
/// `.` itself.
#[derive(Clone, Debug)]
pub struct FilePattern {
    pattern: String,
    regex: Regex,
}
impl FilePattern {
    /// Compiles a pattern.
    pub fn new(pattern: &str) -> Self {
        let mut expr = String::from("(?i)^");
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                c => expr.push_str(&regex::escape(&c.to_string())),
            }
        }
        expr.push('$');
        Self {
            pattern: pattern.to_string(),
            // Every other character is escaped, so this can't fail.
            regex: Regex::new(&expr).expect("escaped pattern is a valid regex"),
        }
    }

    /// Whether a bare file name matches.
    pub fn matches(&self, name: &str) -> bool {
        if name.starts_with('.') && !self.pattern.starts_with('.') {
            return false;
        }
        self.regex.is_match(name)
    }

    /// The pattern as it was written.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

/// Lists the files directly inside `folder` that match any of `patterns`, in
/// natural order. An unreadable or missing folder yields an empty list.
pub fn matching_files(folder: &Path, patterns: &[FilePattern]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("skipping unreadable entry in {folder:?}: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let name = file_name(path);
            patterns.iter().any(|p| p.matches(&name))
        })
        .collect();
    natural_sort(&mut files);
    files
}

/// Lists the subdirectories directly inside `folder`, in natural order.
pub fn subdirectories(folder: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect();
    natural_sort(&mut dirs);
    dirs
}

/// The final component of a path as a string, or an empty string if there
/// isn't one.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn numbers_sort_as_integers() {
        let mut paths: Vec<PathBuf> = ["s10.wav", "s2.wav", "s1.wav"]
            .iter()
            .map(PathBuf::from)
            .collect();
        natural_sort(&mut paths);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("s1.wav"),
                PathBuf::from("s2.wav"),
                PathBuf::from("s10.wav")
            ]
        );
    }

    #[test]
    fn natural_keys_ignore_case_and_handle_edges() {
        assert!(NaturalSortKey::new("Note2") < NaturalSortKey::new("note10"));
        assert!(NaturalSortKey::new("a") < NaturalSortKey::new("B"));
        assert!(NaturalSortKey::new("7") < NaturalSortKey::new("08x"));
        assert_eq!(NaturalSortKey::new(""), NaturalSortKey::new(""));
        assert!(
            NaturalSortKey::new("track") < NaturalSortKey::new("track1"),
            "a shorter key that is a prefix should come first"
        );
    }

    #[test]
    fn patterns() {
        let wav = FilePattern::new("*.wav");
        assert!(wav.matches("piano-01.wav"));
        assert!(wav.matches("LOUD.WAV"));
        assert!(!wav.matches("piano.wav.bak"));
        assert!(!wav.matches("piano.ogg"));

        let single = FilePattern::new("s?.mp3");
        assert!(single.matches("s1.mp3"));
        assert!(!single.matches("s10.mp3"));

        let dotted = FilePattern::new("a.b");
        assert!(!dotted.matches("axb"), "dots are literal");
        assert_eq!(dotted.as_str(), "a.b");
    }

    #[test]
    fn hidden_files_need_a_dotted_pattern() {
        let wav = FilePattern::new("*.wav");
        assert!(!wav.matches("._s1.wav"));
        assert!(!wav.matches(".wav"));
        assert!(FilePattern::new(".*.wav").matches("._s1.wav"));

        let dir = tempfile::tempdir().unwrap();
        for name in ["s1.wav", "s2.wav", "._s1.wav", ".DS_Store"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let names: Vec<String> = matching_files(dir.path(), &[wav, FilePattern::new("*")])
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["s1.wav", "s2.wav"], "hidden files never take a slot");
    }

    #[test]
    fn matching_files_filters_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["s10.wav", "s2.ogg", "s1.wav", "readme.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.wav")).unwrap();

        let files = matching_files(
            dir.path(),
            &[FilePattern::new("*.wav"), FilePattern::new("*.ogg")],
        );
        let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["s1.wav", "s2.ogg", "s10.wav"]);

        assert!(matching_files(&dir.path().join("missing"), &[FilePattern::new("*")]).is_empty());
    }

    #[test]
    fn subdirectories_are_listed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["kit10", "kit2", "kit1"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("kit3"), b"not a dir").unwrap();
        let names: Vec<String> = subdirectories(dir.path())
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["kit1", "kit2", "kit10"]);
    }
}
