use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::template::Pattern;

/// Lines starting with this continue the block above them.
pub const CONTINUATION_INDENT: char = ' ';

/// Upper bounds for a single run. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanLimits {
    pub max_lines: Option<usize>,
    pub max_entities: Option<usize>,
}

impl ScanLimits {
    pub fn check_lines(&self, count: usize) -> Result<()> {
        check("lines", count, self.max_lines)
    }

    pub fn check_entities(&self, count: usize) -> Result<()> {
        check("entities", count, self.max_entities)
    }
}

fn check(what: &'static str, count: usize, limit: Option<usize>) -> Result<()> {
    match limit {
        Some(limit) if count > limit => Err(Error::BudgetExceeded { what, limit }),
        _ => Ok(()),
    }
}

/// Partitions lines into the blocks opened by one header pattern.
pub struct Segmenter<'p> {
    pattern: &'p Pattern,
    max_entities: Option<usize>,
}

impl<'p> Segmenter<'p> {
    pub fn new(pattern: &'p Pattern) -> Self {
        Segmenter {
            pattern,
            max_entities: None,
        }
    }

    pub fn with_limit(mut self, max_entities: Option<usize>) -> Self {
        self.max_entities = max_entities;
        self
    }

    pub fn run(&self, lines: &[String]) -> Result<Vec<Entity>> {
        let mut state = ScanState::new(lines, self.pattern);
        state.max_entities = self.max_entities;
        state.try_run()
    }
}

// ---------------------------------------------------------------------------
// Scan state
// ---------------------------------------------------------------------------

/// Why a block stopped where it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockEnd {
    /// The header pattern matched again with another name (exclusive).
    NameChange,
    /// A non-matching line without continuation indent (exclusive).
    Dedent,
    /// The source ran out (inclusive of the last line).
    EndOfSource,
}

struct ScanState<'a> {
    lines: &'a [String],
    pattern: &'a Pattern,
    /// Next unconsumed line.
    position: usize,
    max_entities: Option<usize>,
    entities: Vec<Entity>,
}

impl<'a> ScanState<'a> {
    fn new(lines: &'a [String], pattern: &'a Pattern) -> Self {
        ScanState {
            lines,
            pattern,
            position: 0,
            max_entities: None,
            entities: Vec::new(),
        }
    }

    fn try_run(mut self) -> Result<Vec<Entity>> {
        loop {
            if let Some(limit) = self.max_entities {
                if self.entities.len() >= limit && self.find_block_start().is_some() {
                    return Err(Error::BudgetExceeded {
                        what: "entities",
                        limit,
                    });
                }
            }
            if !self.next_block() {
                return Ok(self.entities);
            }
        }
    }

    /// Open, extend and close one block. Returns false once no header remains.
    fn next_block(&mut self) -> bool {
        let Some((start, name)) = self.find_block_start() else {
            return false;
        };
        let (end, reason) = self.find_block_end(start, name);
        debug!(
            type_label = self.pattern.type_label(),
            block = name,
            start,
            end,
            ?reason,
            "block closed"
        );
        self.emit(start, end, name);
        true
    }

    /// Scan forward from `position` for the next header line.
    fn find_block_start(&self) -> Option<(usize, &'a str)> {
        let lines = self.lines;
        let found = lines
            .iter()
            .enumerate()
            .skip(self.position)
            .find_map(|(index, line)| self.pattern.capture_name(line).map(|name| (index, name)));
        if found.is_none() {
            debug!(
                type_label = self.pattern.type_label(),
                from = self.position,
                "no further block start"
            );
        }
        found
    }

    /// Find the exclusive end of the block whose header is at `start`.
    fn find_block_end(&self, start: usize, name: &str) -> (usize, BlockEnd) {
        for (index, line) in self.lines.iter().enumerate().skip(start + 1) {
            match self.pattern.capture_name(line) {
                Some(other) if other != name => return (index, BlockEnd::NameChange),
                Some(_) => {}
                None if !line.starts_with(CONTINUATION_INDENT) => {
                    return (index, BlockEnd::Dedent);
                }
                None => {}
            }
        }
        (self.lines.len(), BlockEnd::EndOfSource)
    }

    fn emit(&mut self, start: usize, end: usize, name: &str) {
        let text = self.lines[start..end].to_vec();
        self.entities
            .push(Entity::new(self.pattern.type_label(), name, text, start..end));
        self.position = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Anchor;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    fn host() -> Pattern {
        Pattern::compile("host", "host {{name}}", Anchor::Full).unwrap()
    }

    fn segment(src: &[String], pattern: &Pattern) -> Vec<Entity> {
        Segmenter::new(pattern).run(src).unwrap()
    }

    fn spans(entities: &[Entity]) -> Vec<(String, std::ops::Range<usize>)> {
        entities
            .iter()
            .map(|e| (e.id.clone(), e.lines.clone()))
            .collect()
    }

    #[test]
    fn two_hosts_with_bodies() {
        let src = lines("host router1\n ip 10.0.0.1\n peer router2\nhost router2\n ip 10.0.0.2");
        let entities = segment(&src, &host());
        assert_eq!(
            spans(&entities),
            [("host router1".to_string(), 0..3), ("host router2".to_string(), 3..5)]
        );
        assert_eq!(entities[1].text, ["host router2", " ip 10.0.0.2"]);
    }

    #[test]
    fn empty_source_has_no_blocks() {
        assert!(segment(&[], &host()).is_empty());
    }

    #[test]
    fn no_header_has_no_blocks() {
        assert!(segment(&lines("router a\n peer b"), &host()).is_empty());
    }

    #[test]
    fn header_on_last_line_is_single_line_block() {
        let entities = segment(&lines("other\nhost last"), &host());
        assert_eq!(spans(&entities), [("host last".to_string(), 1..2)]);
    }

    #[test]
    fn adjacent_headers_with_different_names_split() {
        let entities = segment(&lines("host a\nhost b"), &host());
        assert_eq!(
            spans(&entities),
            [("host a".to_string(), 0..1), ("host b".to_string(), 1..2)]
        );
    }

    #[test]
    fn repeated_header_with_same_name_continues() {
        let entities = segment(&lines("host a\n x\nhost a\n y\nend"), &host());
        assert_eq!(spans(&entities), [("host a".to_string(), 0..4)]);
    }

    #[test]
    fn dedent_closes_block_and_scan_resumes() {
        let entities = segment(&lines("host a\n x\nhostname r1\n y\nhost b"), &host());
        assert_eq!(
            spans(&entities),
            [("host a".to_string(), 0..2), ("host b".to_string(), 4..5)]
        );
    }

    #[test]
    fn other_rule_headers_inside_are_continuation_when_indented() {
        let entities = segment(&lines("host a\n interface eth0\n  ip 1\n"), &host());
        assert_eq!(spans(&entities), [("host a".to_string(), 0..3)]);
    }

    #[test]
    fn tab_indent_is_not_continuation() {
        let entities = segment(&lines("host a\n\tx"), &host());
        assert_eq!(spans(&entities), [("host a".to_string(), 0..1)]);
    }

    #[test]
    fn limit_is_enforced() {
        let src = lines("host a\nhost b\nhost c");
        let pattern = host();
        let err = Segmenter::new(&pattern).with_limit(Some(2)).run(&src).unwrap_err();
        assert!(matches!(
            err,
            Error::BudgetExceeded {
                what: "entities",
                limit: 2
            }
        ));
        assert_eq!(Segmenter::new(&pattern).with_limit(Some(3)).run(&src).unwrap().len(), 3);
    }

    #[test]
    fn scan_limits_check() {
        let limits = ScanLimits {
            max_lines: Some(10),
            max_entities: None,
        };
        assert!(limits.check_lines(10).is_ok());
        assert!(limits.check_lines(11).is_err());
        assert!(limits.check_entities(usize::MAX).is_ok());
    }
}
