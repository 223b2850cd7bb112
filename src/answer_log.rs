// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! The Markdown answer log
//!
//! The document is a header block that ends with a `---` line, followed by
//! entry blocks that are each terminated by a `---` line. New entries go
//! directly below the header, so the stored file is newest-first.

use chrono::{DateTime, Local};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::Result;

/// Line separating the header and every entry
pub const DELIMITER: &str = "---";

/// What an answer line equal to the delimiter is rewritten to.
/// Markdown renders both as a thematic break.
const ESCAPED_DELIMITER: &str = "- - -";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn is_delimiter(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']) == DELIMITER
}

/// One answered screenshot
#[derive(Debug, Clone)]
pub struct AnswerEntry {
    pub source_filename: String,
    pub timestamp: DateTime<Local>,
    pub answer: String,
}

impl AnswerEntry {
    pub fn new(source_filename: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            source_filename: source_filename.into(),
            timestamp: Local::now(),
            answer: answer.into(),
        }
    }

    /// Render the entry block, including its terminating delimiter line
    pub fn render(&self) -> String {
        let filename = self.source_filename.replace(['\n', '\r'], " ");
        let answer: Vec<&str> = self
            .answer
            .lines()
            .map(|line| if is_delimiter(line) { ESCAPED_DELIMITER } else { line })
            .collect();

        format!(
            "\n## Screenshot: {}\n**Time:** {}\n\n{}\n\n{}\n",
            filename,
            self.timestamp.format(TIMESTAMP_FORMAT),
            answer.join("\n"),
            DELIMITER
        )
    }
}

/// A parsed answer log: header plus entry blocks without their delimiters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerLogDocument {
    header: String,
    entries: Vec<String>,
}

impl AnswerLogDocument {
    /// Empty document with the default header
    pub fn new(started: DateTime<Local>) -> Self {
        Self {
            header: format!(
                "# Screenshot Answers\n\nStarted: {}\n\n{}\n",
                started.format(TIMESTAMP_FORMAT),
                DELIMITER
            ),
            entries: Vec::new(),
        }
    }

    pub fn parse(text: &str) -> Self {
        let mut offset = 0;
        let mut header_end = None;
        for line in text.split_inclusive('\n') {
            offset += line.len();
            if is_delimiter(line) {
                header_end = Some(offset);
                break;
            }
        }

        let (header, body) = match header_end {
            Some(end) => (text[..end].to_string(), &text[end..]),
            None => {
                // A header without its delimiter would swallow the first entry on the next parse
                let mut header = text.to_string();
                if !header.is_empty() && !header.ends_with('\n') {
                    header.push('\n');
                }
                header.push_str(DELIMITER);
                header.push('\n');
                (header, "")
            }
        };

        let mut entries = Vec::new();
        let mut current = String::new();
        for line in body.split_inclusive('\n') {
            if is_delimiter(line) {
                push_fragment(&mut entries, &mut current);
            } else {
                current.push_str(line);
            }
        }
        push_fragment(&mut entries, &mut current);

        Self { header, entries }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Entry blocks in stored order, without their delimiter lines
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Put an entry directly below the header
    pub fn push_newest(&mut self, entry: &AnswerEntry) {
        let rendered = entry.render();
        let block = rendered
            .strip_suffix(&format!("{}\n", DELIMITER))
            .unwrap_or(&rendered)
            .to_string();
        self.entries.insert(0, block);
    }

    /// Same header, entries in the opposite order
    pub fn reversed(&self) -> Self {
        Self {
            header: self.header.clone(),
            entries: self.entries.iter().rev().cloned().collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = self.header.clone();
        for entry in &self.entries {
            out.push_str(entry);
            out.push_str(DELIMITER);
            out.push('\n');
        }
        out
    }
}

fn push_fragment(entries: &mut Vec<String>, current: &mut String) {
    if !current.trim().is_empty() {
        let mut fragment = std::mem::take(current);
        if !fragment.ends_with('\n') {
            fragment.push('\n');
        }
        entries.push(fragment);
    }
    current.clear();
}

/// Oldest-first view of a newest-first document (and vice versa)
pub fn chronological(document: &str) -> String {
    AnswerLogDocument::parse(document).reversed().render()
}

/// The answer log file on disk
pub struct AnswerLog {
    path: PathBuf,
}

impl AnswerLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Write an empty document if there is none yet
    pub fn ensure_exists(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        write_atomic(&self.path, AnswerLogDocument::new(Local::now()).render().as_bytes())?;
        Ok(true)
    }

    /// Read the document, or an empty default one when the file is absent
    pub fn load(&self) -> Result<AnswerLogDocument> {
        Ok(AnswerLogDocument::parse(&self.read_to_string()?))
    }

    /// Raw document text, as stored
    pub fn read_to_string(&self) -> Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(AnswerLogDocument::new(Local::now()).render())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Add an entry at the top of the log
    pub fn insert_newest(&self, entry: &AnswerEntry) -> Result<()> {
        let mut document = self.load()?;
        document.push_newest(entry);
        write_atomic(&self.path, document.render().as_bytes())?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Replace `path` so readers see either the old or the new contents, never a mix
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    // temp files start out owner-only; keep whatever mode the target already has
    if let Ok(existing) = std::fs::metadata(path) {
        tmp.as_file().set_permissions(existing.permissions())?;
    }
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
