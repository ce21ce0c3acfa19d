//! Tagged pattern tables for intent detection.
//!
//! Keyword and phrase detection lives here as data (pattern → intent kind)
//! so each pattern can be tested and extended on its own.

use crate::error::{QuillError, Result};
use regex::Regex;

/// What a matched phrase asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    /// The conversation talks about producing a document.
    CreateDocument,
    /// The user wants the personas to look at an existing document.
    ReadDocument,
}

/// Skeleton chosen for a synthesized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Outline,
    Treatment,
    Script,
    Character,
    Generic,
}

/// One row of an intent table.
#[derive(Debug, Clone)]
pub struct IntentPattern {
    pub kind: IntentKind,
    pub regex: Regex,
}

/// A single detection result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentMatch {
    pub kind: IntentKind,
    /// Captured `target` group (the document name for read requests).
    pub target: Option<String>,
}

const CREATION_PATTERNS: &[&str] = &[r"(?i)\b(create|write|outline|document|script|treatment)\b"];

const READ_PATTERNS: &[&str] = &[
    r"(?i)\b(?:read|open|look at|check|review) (?:the|my|our) (?P<target>[a-z0-9_'-]+(?: [a-z0-9_'-]+){0,3}?)(?: (?:file|doc))?(?:[.?!,;:]|\s*$)",
    r"(?i)\bthe (?P<target>[a-z0-9_'-]+(?: [a-z0-9_'-]+)? (?:outline|treatment|script|draft|notes))\b",
];

const TEMPLATE_PATTERNS: &[(&str, TemplateKind)] = &[
    (r"(?i)\boutline", TemplateKind::Outline),
    (r"(?i)\btreatment", TemplateKind::Treatment),
    (r"(?i)\b(script|screenplay)", TemplateKind::Script),
    (r"(?i)\bcharacter", TemplateKind::Character),
];

/// Ordered pattern table. Earlier rows win when a caller wants one answer.
#[derive(Debug, Clone)]
pub struct IntentTable {
    patterns: Vec<IntentPattern>,
    templates: Vec<(Regex, TemplateKind)>,
}

impl IntentTable {
    /// Builds a table from raw pattern strings, rejecting invalid regexes.
    pub fn with_patterns(
        patterns: &[(&str, IntentKind)],
        templates: &[(&str, TemplateKind)],
    ) -> Result<Self> {
        let compile = |p: &str| {
            Regex::new(p).map_err(|e| QuillError::config(format!("invalid pattern '{}': {}", p, e)))
        };

        let patterns = patterns
            .iter()
            .map(|(p, kind)| {
                Ok(IntentPattern {
                    kind: *kind,
                    regex: compile(p)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let templates = templates
            .iter()
            .map(|(p, kind)| Ok((compile(p)?, *kind)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            templates,
        })
    }

    /// The built-in table used by the engine.
    pub fn standard() -> Self {
        let patterns = CREATION_PATTERNS
            .iter()
            .map(|p| (*p, IntentKind::CreateDocument))
            .chain(READ_PATTERNS.iter().map(|p| (*p, IntentKind::ReadDocument)))
            .filter_map(|(p, kind)| Regex::new(p).ok().map(|regex| IntentPattern { kind, regex }))
            .collect();
        let templates = TEMPLATE_PATTERNS
            .iter()
            .filter_map(|(p, kind)| Regex::new(p).ok().map(|r| (r, *kind)))
            .collect();

        Self {
            patterns,
            templates,
        }
    }

    /// Appends a pattern row.
    pub fn push(&mut self, kind: IntentKind, pattern: &str) -> Result<()> {
        let regex = Regex::new(pattern)
            .map_err(|e| QuillError::config(format!("invalid pattern '{}': {}", pattern, e)))?;
        self.patterns.push(IntentPattern { kind, regex });
        Ok(())
    }

    pub fn patterns(&self) -> &[IntentPattern] {
        &self.patterns
    }

    /// Runs every row against `text`, in table order.
    pub fn detect(&self, text: &str) -> Vec<IntentMatch> {
        let mut matches = Vec::new();
        for pattern in &self.patterns {
            for captures in pattern.regex.captures_iter(text) {
                let target = captures
                    .name("target")
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|t| !t.is_empty());
                let found = IntentMatch {
                    kind: pattern.kind,
                    target,
                };
                if !matches.contains(&found) {
                    matches.push(found);
                }
            }
        }
        matches
    }

    pub fn has_creation_intent(&self, text: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.kind == IntentKind::CreateDocument && p.regex.is_match(text))
    }

    /// Document names the text asks to read, in order of first mention.
    pub fn read_requests(&self, text: &str) -> Vec<String> {
        self.detect(text)
            .into_iter()
            .filter(|m| m.kind == IntentKind::ReadDocument)
            .filter_map(|m| m.target)
            .collect()
    }

    /// Picks the skeleton for a synthesized document; the first matching row wins.
    pub fn template_for(&self, text: &str) -> TemplateKind {
        self.templates
            .iter()
            .find(|(regex, _)| regex.is_match(text))
            .map(|(_, kind)| *kind)
            .unwrap_or(TemplateKind::Generic)
    }
}

impl Default for IntentTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Builds the anchored "addressed at the start of the message" pattern for a name.
///
/// Matches `name` case-insensitively at the start of the message followed
/// by `,`, `:` or a space.
pub fn addressed_pattern(name: &str) -> Result<Regex> {
    let pattern = format!(r"(?i)^\s*{}[,: ]", regex::escape(name.trim()));
    Regex::new(&pattern).map_err(|e| QuillError::config(format!("invalid name pattern: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_compiles_every_row() {
        let table = IntentTable::standard();
        assert_eq!(
            table.patterns().len(),
            CREATION_PATTERNS.len() + READ_PATTERNS.len()
        );
    }

    #[test]
    fn creation_keywords_are_whole_words() {
        let table = IntentTable::standard();
        assert!(table.has_creation_intent("let's create an outline for this"));
        assert!(table.has_creation_intent("Can someone WRITE the treatment?"));
        assert!(!table.has_creation_intent("the rewritten scene feels recreated"));
    }

    #[test]
    fn read_requests_capture_document_names() {
        let table = IntentTable::standard();
        assert_eq!(
            table.read_requests("Please read the pilot draft."),
            vec!["pilot draft".to_string()]
        );
        assert_eq!(
            table.read_requests("what do you think of the heist outline?"),
            vec!["heist outline".to_string()]
        );
        assert!(table.read_requests("fix this line").is_empty());
    }

    #[test]
    fn template_selection_prefers_earlier_rows() {
        let table = IntentTable::standard();
        assert_eq!(
            table.template_for("write an outline and a treatment"),
            TemplateKind::Outline
        );
        assert_eq!(table.template_for("draft the screenplay"), TemplateKind::Script);
        assert_eq!(table.template_for("a character bible"), TemplateKind::Character);
        assert_eq!(table.template_for("make a document"), TemplateKind::Generic);
    }

    #[test]
    fn custom_rows_extend_the_table() {
        let mut table = IntentTable::standard();
        table
            .push(IntentKind::CreateDocument, r"(?i)\bbeat sheet\b")
            .unwrap();
        assert!(table.has_creation_intent("we need a beat sheet"));
        assert!(table.push(IntentKind::ReadDocument, "(").is_err());
    }

    #[test]
    fn addressed_pattern_requires_separator() {
        let re = addressed_pattern("Aaron").unwrap();
        assert!(re.is_match("Aaron, fix this line"));
        assert!(re.is_match("aaron: thoughts?"));
        assert!(re.is_match("AARON what now"));
        assert!(!re.is_match("Aaronson, hi"));
        assert!(!re.is_match("ask Aaron, please"));
    }
}
