use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Decides which raw lines take part in extraction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LineFilter {
    /// Lines starting with one of these are comments.
    pub comment_markers: Vec<String>,
    /// Lines starting with one of these are directives.
    pub directive_markers: Vec<String>,
}

impl Default for LineFilter {
    fn default() -> Self {
        LineFilter {
            comment_markers: vec!["!".to_string()],
            directive_markers: vec![":".to_string()],
        }
    }
}

impl LineFilter {
    /// A filter that only drops blank lines.
    pub fn blank_only() -> Self {
        LineFilter {
            comment_markers: Vec::new(),
            directive_markers: Vec::new(),
        }
    }

    /// True unless the line is a comment, a directive, or blank.
    pub fn keeps(&self, line: &str) -> bool {
        !line.trim_end().is_empty()
            && !starts_with_any(line, &self.comment_markers)
            && !starts_with_any(line, &self.directive_markers)
    }
}

fn starts_with_any(line: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|m| !m.is_empty() && line.starts_with(m.as_str()))
}

/// The filtered configuration, one entry per kept line, trailing whitespace removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLines {
    lines: Vec<String>,
}

impl SourceLines {
    /// Read and filter a configuration file.
    pub fn load(path: impl AsRef<Path>, filter: &LineFilter) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => Error::ConfigNotFound(path.to_path_buf()),
            _ => Error::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let source = SourceLines::parse(&text, filter);
        info!(path = %path.display(), lines = source.len(), "loaded configuration");
        Ok(source)
    }

    /// Filter configuration text already in memory.
    pub fn parse(text: &str, filter: &LineFilter) -> Self {
        let text = text.trim_start_matches('\u{feff}');
        let mut dropped = 0usize;
        let lines = text
            .lines()
            .filter(|line| {
                let keep = filter.keeps(line);
                if !keep {
                    dropped += 1;
                }
                keep
            })
            .map(|line| line.trim_end().to_string())
            .collect();
        debug!(dropped, "filtered configuration lines");
        SourceLines { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
