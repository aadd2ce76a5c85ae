//! Recurring paragraph shapes ("Rationale for ...", "Note, ...",
//! "Example (informative)") that mark structural paragraphs.
//!
//! Rules form an ordered table. Each paragraph is tested against the rules
//! in order and counts toward the first one that matches; a rule is promoted
//! once its count reaches the rule's `min_occurrences`.

use once_cell::sync::Lazy;
use regex::Regex;

use docx_core::model::{ParagraphRecord, PatternKind, PatternMatch};

static WORD_FOR_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{Lu}\w*\s+(?i:for)\s+\S").unwrap());
static WORD_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\p{Lu}\w*,\s*\S").unwrap());
static WORD_PARENTHETICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{Lu}\w*\s*\([^)]+\)").unwrap());

#[derive(Debug, Clone)]
pub struct PatternRule {
    pub kind: PatternKind,
    pub matcher: Regex,
    pub min_occurrences: usize,
}

impl PatternRule {
    pub fn new(kind: PatternKind, matcher: Regex, min_occurrences: usize) -> Self {
        Self {
            kind,
            matcher,
            min_occurrences,
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

/// The built-in rule table, in evaluation order.
pub fn default_rules(min_occurrences: usize) -> Vec<PatternRule> {
    vec![
        PatternRule::new(PatternKind::WordForWord, WORD_FOR_WORD_RE.clone(), min_occurrences),
        PatternRule::new(PatternKind::WordComma, WORD_COMMA_RE.clone(), min_occurrences),
        PatternRule::new(
            PatternKind::WordParenthetical,
            WORD_PARENTHETICAL_RE.clone(),
            min_occurrences,
        ),
    ]
}

/// Classifies paragraph text against an ordered rule table.
#[derive(Debug, Clone)]
pub struct PatternTable {
    rules: Vec<PatternRule>,
    max_length: usize,
}

impl PatternTable {
    pub fn new(rules: Vec<PatternRule>, max_length: usize) -> Self {
        Self { rules, max_length }
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    /// Kind of the first rule matching `text`, if any.
    pub fn classify(&self, text: &str) -> Option<PatternKind> {
        let text = text.trim();
        if text.is_empty() || text.chars().count() > self.max_length {
            return None;
        }
        self.rules.iter().find(|r| r.matches(text)).map(|r| r.kind)
    }

    /// Count shapes across the stream and return the promoted ones, in rule
    /// table order, each with up to `max_examples` example texts.
    pub fn promote(&self, paragraphs: &[ParagraphRecord], max_examples: usize) -> Vec<PatternMatch> {
        let mut counts: Vec<(usize, Vec<String>)> = vec![(0, Vec::new()); self.rules.len()];
        for p in paragraphs {
            let text = p.text.trim();
            if text.is_empty() || text.chars().count() > self.max_length {
                continue;
            }
            if let Some(pos) = self.rules.iter().position(|r| r.matches(text)) {
                let (count, examples) = &mut counts[pos];
                *count += 1;
                if examples.len() < max_examples {
                    examples.push(text.to_string());
                }
            }
        }

        self.rules
            .iter()
            .zip(counts)
            .filter(|(rule, (count, _))| *count >= rule.min_occurrences)
            .map(|(rule, (count, examples))| {
                log::debug!("Promoted pattern {} ({} occurrences)", rule.kind, count);
                PatternMatch {
                    pattern_kind: rule.kind,
                    occurrence_count: count,
                    examples,
                }
            })
            .collect()
    }
}
