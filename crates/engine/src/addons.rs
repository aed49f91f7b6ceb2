//! Reader for `*.addons` extension manifests.
//!
//! A manifest is a line-oriented text file. Each line names a candidate
//! pack, a directory to scan, or a glob for either; `#` starts a comment.
//! Paths use `/` separators; `\` is accepted and normalized. Relative
//! entries resolve against the manifest's own directory.

use std::io::{BufRead, BufReader, Read};

use crate::error::{EngineError, Result};

/// One significant line of an addons manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonsEntry {
    line_number: usize,
    raw: String,
    text: String,
}

impl AddonsEntry {
    fn new(line_number: usize, raw: &str) -> Self {
        let significant = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        AddonsEntry {
            line_number,
            raw: raw.to_string(),
            text: significant.trim().replace('\\', "/"),
        }
    }

    /// One-based line number in the manifest.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// The line as written, comments included.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The normalized path or pattern.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// True if the entry is blank once comments are stripped.
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    /// True if the entry names a directory rather than a file.
    pub fn is_directory(&self) -> bool {
        self.text.ends_with('/')
    }

    /// True if the entry contains `*`. A `?` alone does not make an entry
    /// a pattern; such entries stay explicit and load failures stay fatal.
    pub fn is_pattern(&self) -> bool {
        self.text.contains('*')
    }

    /// True for absolute entries, which resolve from the filesystem root
    /// instead of the manifest's directory.
    pub fn is_fully_qualified(&self) -> bool {
        let text = self.text.as_str();
        text.starts_with('/') || has_drive_prefix(text)
    }

    /// False if the entry cannot be a path even with its wildcards filled
    /// in.
    pub fn is_valid_path(&self) -> bool {
        if self.text.is_empty() {
            return false;
        }
        self.text
            .chars()
            .all(|c| !c.is_control() && !matches!(c, '<' | '>' | '|' | '"'))
    }
}

fn has_drive_prefix(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(drive), Some(':'), Some('/')) if drive.is_ascii_alphabetic()
    )
}

/// A fully parsed addons manifest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddonsFile {
    entries: Vec<AddonsEntry>,
}

impl AddonsFile {
    /// Reads a manifest, failing on the first entry that cannot be a
    /// path. `origin` names the manifest in errors.
    pub fn read(reader: impl Read, origin: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (index, line) in BufReader::new(reader).lines().enumerate() {
            let raw = line?;
            let entry = AddonsEntry::new(index + 1, &raw);
            if entry.is_blank() {
                continue;
            }
            if !entry.is_valid_path() {
                return Err(EngineError::ManifestEntry {
                    file: origin.to_string(),
                    line: entry.line_number,
                    text: entry.raw,
                });
            }
            entries.push(entry);
        }
        Ok(AddonsFile { entries })
    }

    pub fn entries(&self) -> &[AddonsEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
