//! Canonical text and comparison keys.
//!
//! Canonical text is the line-oriented projection of a canvas that is both
//! stored locally and diffed. The comparison key drops blank lines and
//! surrounding whitespace so that layout noise never counts as a change.

use crate::doc::{Node, StructuredDocument, parse_canonical_line};
use std::collections::HashSet;
use std::fmt;

/// Running state of the canonical projection. A heading text is emitted
/// at most once per document, at its first occurrence.
#[derive(Debug, Default)]
struct CanonicalFold {
    lines: Vec<String>,
    seen_headings: HashSet<String>,
}

impl CanonicalFold {
    fn push(mut self, node: &Node) -> Self {
        match node {
            Node::Heading { level, text } => {
                let text = text.trim();
                if text.is_empty() || !self.seen_headings.insert(text.to_string()) {
                    return self;
                }
                if self.lines.last().is_some_and(|line| !line.is_empty()) {
                    self.lines.push(String::new());
                }
                self.lines
                    .push(format!("{} {}", "#".repeat(usize::from(*level)), text));
                self.lines.push(String::new());
            }
            Node::ListItem { checked, text } => {
                let checkbox = if *checked { "[x]" } else { "[ ]" };
                let line = format!("- {checkbox} {}", text.trim());
                self.lines.push(line.trim_end().to_string());
            }
            Node::Paragraph { text } => {
                // Text that reads as a heading, item or divider is folded as
                // one, matching how the canonical line will be read back.
                for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    self = match parse_canonical_line(line) {
                        Node::Paragraph { text } => {
                            self.lines.push(text);
                            self
                        }
                        structural => self.push(&structural),
                    };
                }
            }
            Node::Divider => self.lines.push("---".to_string()),
        }
        self
    }

    fn finish(self) -> String {
        self.lines.join("\n").trim().to_string()
    }
}

/// Projects a canvas document to canonical text.
pub fn canonical_text(doc: &StructuredDocument) -> String {
    doc.nodes()
        .iter()
        .fold(CanonicalFold::default(), CanonicalFold::push)
        .finish()
}

/// Local files already hold canonical text; only the surrounding whitespace
/// of the whole file is dropped.
pub fn local_canonical(raw: &str) -> String {
    raw.trim().to_string()
}

/// Non-blank lines of a canonical text, each trimmed, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonKey(Vec<String>);

impl ComparisonKey {
    pub fn lines(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ComparisonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("\n"))
    }
}

pub fn comparison_key(text: &str) -> ComparisonKey {
    ComparisonKey(
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

pub fn has_differences(a: &str, b: &str) -> bool {
    comparison_key(a) != comparison_key(b)
}
