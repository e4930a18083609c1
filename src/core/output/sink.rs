//! Output destinations for rendered transcripts and records.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;

/// Receives rendered output. Keys are a person's display name for
/// transcripts and a thread id for records.
pub trait OutputSink {
    /// Stores one person's full transcript.
    fn write_transcript(&mut self, person: &str, text: &str) -> Result<()>;

    /// Stores one conversation's structured record.
    fn write_record(&mut self, thread_id: &str, extension: &str, text: &str) -> Result<()>;
}

/// Directory name for transcripts inside the output root.
pub const TEXT_DIR: &str = "text";
/// Directory name for structured records inside the output root.
pub const RECORDS_DIR: &str = "records";

/// File stems handed out inside one directory.
///
/// Distinct keys can sanitize to the same stem (`Ann/Work`, `Ann_Work`), and
/// some filesystems ignore case, so later keys get a ` (2)`, ` (3)` suffix
/// instead of overwriting an earlier file.
#[derive(Debug, Clone, Default)]
struct FileNames {
    assigned: BTreeMap<String, String>,
    taken: BTreeSet<String>,
}

impl FileNames {
    fn stem_for(&mut self, key: &str) -> String {
        if let Some(stem) = self.assigned.get(key) {
            return stem.clone();
        }

        let base = sanitize_file_name(key);
        let mut stem = base.clone();
        let mut n = 1;
        while self.taken.contains(&stem.to_lowercase()) {
            n += 1;
            stem = format!("{base} ({n})");
        }
        if n > 1 {
            warn!(key, file = %stem, "file name already used, writing under a suffixed name");
        }

        self.taken.insert(stem.to_lowercase());
        self.assigned.insert(key.to_string(), stem.clone());
        stem
    }
}

/// Writes `<root>/text/<person>.txt` and `<root>/records/<thread>.<ext>`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    transcript_names: FileNames,
    record_names: FileNames,
}

impl DirectorySink {
    /// Creates a sink rooted at `root`. Nothing is touched until the first
    /// write or [`prepare`](Self::prepare).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            transcript_names: FileNames::default(),
            record_names: FileNames::default(),
        }
    }

    /// Output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Transcript directory.
    pub fn text_dir(&self) -> PathBuf {
        self.root.join(TEXT_DIR)
    }

    /// Record directory.
    pub fn records_dir(&self) -> PathBuf {
        self.root.join(RECORDS_DIR)
    }

    /// Empties the transcript and record directories so a run never leaves
    /// files from an earlier run behind.
    pub fn prepare(&self) -> Result<()> {
        for dir in [self.text_dir(), self.records_dir()] {
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

impl OutputSink for DirectorySink {
    fn write_transcript(&mut self, person: &str, text: &str) -> Result<()> {
        let dir = self.text_dir();
        fs::create_dir_all(&dir)?;
        let stem = self.transcript_names.stem_for(person);
        fs::write(dir.join(format!("{stem}.txt")), text)?;
        Ok(())
    }

    fn write_record(&mut self, thread_id: &str, extension: &str, text: &str) -> Result<()> {
        let dir = self.records_dir();
        fs::create_dir_all(&dir)?;
        let stem = self.record_names.stem_for(thread_id);
        fs::write(dir.join(format!("{stem}.{extension}")), text)?;
        Ok(())
    }
}

/// Keeps everything in memory. Records are keyed `<thread>.<ext>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySink {
    /// Transcripts by person.
    pub transcripts: BTreeMap<String, String>,
    /// Records by file name.
    pub records: BTreeMap<String, String>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputSink for MemorySink {
    fn write_transcript(&mut self, person: &str, text: &str) -> Result<()> {
        self.transcripts.insert(person.to_string(), text.to_string());
        Ok(())
    }

    fn write_record(&mut self, thread_id: &str, extension: &str, text: &str) -> Result<()> {
        self.records
            .insert(format!("{thread_id}.{extension}"), text.to_string());
        Ok(())
    }
}

/// Makes a display name or thread id safe to use as a file name.
///
/// ```
/// use gchatlog::core::output::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("Ann / Work"), "Ann _ Work");
/// assert_eq!(sanitize_file_name(".."), "_");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_file_name("alice@gmail.com"), "alice@gmail.com");
        assert_eq!(sanitize_file_name("a\tb"), "a_b");
        assert_eq!(sanitize_file_name("  "), "_");
        assert_eq!(sanitize_file_name("x:y"), "x_y");
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.write_transcript("Alice", "hi").unwrap();
        sink.write_record("42", "json", "{}").unwrap();
        assert_eq!(sink.transcripts["Alice"], "hi");
        assert_eq!(sink.records["42.json"], "{}");
    }

    #[test]
    fn test_directory_sink_layout() {
        let dir = tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        sink.write_transcript("Bob", "text").unwrap();
        sink.write_record("7", "jsonl", "line\n").unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("text/Bob.txt")).unwrap(), "text");
        assert_eq!(
            fs::read_to_string(dir.path().join("records/7.jsonl")).unwrap(),
            "line\n"
        );
    }

    #[test]
    fn test_colliding_names_get_suffixes() {
        let dir = tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        sink.write_transcript("Ann/Work", "first").unwrap();
        sink.write_transcript("Ann_Work", "second").unwrap();
        sink.write_transcript("ann_work", "third").unwrap();

        let text = sink.text_dir();
        assert_eq!(fs::read_to_string(text.join("Ann_Work.txt")).unwrap(), "first");
        assert_eq!(fs::read_to_string(text.join("Ann_Work (2).txt")).unwrap(), "second");
        assert_eq!(fs::read_to_string(text.join("ann_work (3).txt")).unwrap(), "third");
    }

    #[test]
    fn test_same_key_rewrites_same_file() {
        let dir = tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        sink.write_record("a/b", "json", "old").unwrap();
        sink.write_record("a/b", "json", "new").unwrap();

        let entries = fs::read_dir(sink.records_dir()).unwrap().count();
        assert_eq!(entries, 1);
        assert_eq!(fs::read_to_string(sink.records_dir().join("a_b.json")).unwrap(), "new");
    }

    #[test]
    fn test_prepare_clears_stale_files() {
        let dir = tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        sink.write_transcript("Old Name", "stale").unwrap();

        sink.prepare().unwrap();
        assert!(sink.text_dir().exists());
        assert!(!sink.text_dir().join("Old Name.txt").exists());
    }
}
