//! Paragraph stream input and the structure model derived from it.

use serde::{Deserialize, Serialize};

use crate::units::Twips;

// ---------------------------------------------------------------------------
// Tab stops
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TabAlignment {
    Left,
    Center,
    Right,
    Decimal,
    Bar,
    /// `w:val="clear"`: removes an inherited stop at the same position.
    Clear,
}

impl TabAlignment {
    pub fn from_word(val: &str) -> Option<Self> {
        match val {
            "left" | "start" | "num" => Some(TabAlignment::Left),
            "center" => Some(TabAlignment::Center),
            "right" | "end" => Some(TabAlignment::Right),
            "decimal" => Some(TabAlignment::Decimal),
            "bar" => Some(TabAlignment::Bar),
            "clear" => Some(TabAlignment::Clear),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TabLeader {
    #[default]
    None,
    Dot,
    Hyphen,
    Underscore,
    Heavy,
    MiddleDot,
}

impl TabLeader {
    pub fn from_word(val: &str) -> Self {
        match val {
            "dot" => TabLeader::Dot,
            "hyphen" => TabLeader::Hyphen,
            "underscore" => TabLeader::Underscore,
            "heavy" => TabLeader::Heavy,
            "middleDot" => TabLeader::MiddleDot,
            _ => TabLeader::None,
        }
    }

    /// Character repeated between TOC text and page number.
    pub fn glyph(self) -> Option<char> {
        match self {
            TabLeader::None => None,
            TabLeader::Dot => Some('.'),
            TabLeader::Hyphen => Some('-'),
            TabLeader::Underscore | TabLeader::Heavy => Some('_'),
            TabLeader::MiddleDot => Some('·'),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabStop {
    pub position: Twips,
    pub alignment: TabAlignment,
    #[serde(default)]
    pub leader: TabLeader,
}

// ---------------------------------------------------------------------------
// Paragraph stream
// ---------------------------------------------------------------------------

/// One paragraph of the flat body stream, produced outside this workspace
/// (or by the body reader) and never modified by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagraphRecord {
    pub index: usize,
    pub text: String,
    pub style_id: Option<String>,
    pub num_id: Option<String>,
    pub level: Option<u8>,
    /// Paragraph-level tab stops (direct, or inherited from the style).
    pub tabs: Vec<TabStop>,
    /// A TOC field (or TOC content control) begins in this paragraph.
    pub toc_field_begin: bool,
    /// The TOC field (or content control) ends in this paragraph.
    pub toc_field_end: bool,
}

impl ParagraphRecord {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_style(mut self, style_id: impl Into<String>) -> Self {
        self.style_id = Some(style_id.into());
        self
    }

    pub fn with_numbering(mut self, num_id: impl Into<String>, level: u8) -> Self {
        self.num_id = Some(num_id.into());
        self.level = Some(level);
        self
    }

    /// The `(numId, level)` pair, if the paragraph is numbered.
    /// `numId` 0 explicitly removes numbering.
    pub fn numbering(&self) -> Option<(&str, u8)> {
        match self.num_id.as_deref() {
            Some(id) if !id.is_empty() && id != "0" => Some((id, self.level.unwrap_or(0).min(8))),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Structure model
// ---------------------------------------------------------------------------

/// Recurring textual shapes recognised by the pattern pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// `Rationale for the change`
    WordForWord,
    /// `Note, this applies ...`
    WordComma,
    /// `Example (informative)`
    WordParenthetical,
}

impl PatternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::WordForWord => "word_for_word",
            PatternKind::WordComma => "word_comma",
            PatternKind::WordParenthetical => "word_parenthetical",
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern_kind: PatternKind,
    pub occurrence_count: usize,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub paragraph_index: usize,
    /// 1-based, as in the `TOC1`..`TOC9` styles.
    pub level: u8,
    pub text: String,
    pub page_number: Option<u32>,
    pub leader: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMember {
    pub paragraph_index: usize,
    pub level: u8,
    pub is_special: bool,
    pub pattern_kind: Option<PatternKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListGroup {
    pub num_id: String,
    pub items: Vec<ListMember>,
}

impl ListGroup {
    pub fn new(num_id: impl Into<String>) -> Self {
        Self {
            num_id: num_id.into(),
            items: Vec::new(),
        }
    }

    pub fn numbered_len(&self) -> usize {
        self.items.iter().filter(|m| !m.is_special).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructureModel {
    pub has_toc: bool,
    pub toc_entries: Vec<TocEntry>,
    pub lists: Vec<ListGroup>,
    pub special_patterns: Vec<PatternMatch>,
}

impl StructureModel {
    pub fn is_promoted(&self, kind: PatternKind) -> bool {
        self.special_patterns.iter().any(|p| p.pattern_kind == kind)
    }

    pub fn toc_entry_for(&self, paragraph_index: usize) -> Option<&TocEntry> {
        self.toc_entries
            .iter()
            .find(|e| e.paragraph_index == paragraph_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbering_zero_means_none() {
        let p = ParagraphRecord::new(0, "x").with_numbering("0", 0);
        assert_eq!(p.numbering(), None);
        let p = ParagraphRecord::new(0, "x").with_numbering("4", 2);
        assert_eq!(p.numbering(), Some(("4", 2)));
    }

    #[test]
    fn test_level_clamped() {
        let mut p = ParagraphRecord::new(0, "x").with_numbering("1", 0);
        p.level = Some(12);
        assert_eq!(p.numbering(), Some(("1", 8)));
    }

    #[test]
    fn test_leader_glyphs() {
        assert_eq!(TabLeader::from_word("dot").glyph(), Some('.'));
        assert_eq!(TabLeader::from_word("middleDot").glyph(), Some('·'));
        assert_eq!(TabLeader::from_word("none").glyph(), None);
        assert_eq!(TabAlignment::from_word("end"), Some(TabAlignment::Right));
    }

    #[test]
    fn test_paragraph_record_deserializes_with_defaults() {
        let p: ParagraphRecord =
            toml::from_str("index = 3\ntext = \"Hello\"\nstyle_id = \"Normal\"\n").unwrap();
        assert_eq!(p.index, 3);
        assert_eq!(p.style_id.as_deref(), Some("Normal"));
        assert!(p.tabs.is_empty());
        assert!(!p.toc_field_begin);
    }
}
