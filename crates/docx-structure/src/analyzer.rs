//! Single pass over the flat paragraph stream that finds the table of
//! contents, the recurring special-paragraph shapes and list membership.
//!
//! Nothing here fails: a paragraph the heuristics do not recognise is simply
//! left out of the structure.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use docx_core::model::{
    ListGroup, ListMember, ParagraphRecord, StructureModel, TabAlignment, TocEntry,
};
use docx_core::options::ConversionOptions;

use crate::patterns::{default_rules, PatternTable};

static TOC_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(table\s+of\s+contents|contents)\s*:?\s*$").unwrap());

/// `<text><leader><page>`: the leader is a tab, a run of leader glyphs, or
/// plain spaces.
static TOC_ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<text>.*?\S)(?P<leader>\t+[ \t]*|[ \t]*[.·…_\-]{2,}[ \t]*|[ \t]*…[ \t]*|[ \t]+)(?P<page>\d{1,5})\s*$")
        .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TocState {
    Scanning,
    InToc,
}

pub struct StructureAnalyzer<'a> {
    options: &'a ConversionOptions,
    patterns: PatternTable,
    normal_style: Option<String>,
}

impl<'a> StructureAnalyzer<'a> {
    pub fn new(options: &'a ConversionOptions) -> Self {
        Self {
            options,
            patterns: PatternTable::new(
                default_rules(options.pattern_min_occurrences),
                options.pattern_max_length,
            ),
            normal_style: None,
        }
    }

    /// Id of the document's default paragraph style, when it is not `Normal`.
    pub fn with_normal_style(mut self, style_id: Option<String>) -> Self {
        self.normal_style = style_id;
        self
    }

    pub fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    pub fn analyze(&self, paragraphs: &[ParagraphRecord]) -> StructureModel {
        let (toc_entries, field_seen) = self.find_toc(paragraphs);
        let special_patterns = self
            .patterns
            .promote(paragraphs, self.options.pattern_max_examples);

        let mut model = StructureModel {
            has_toc: field_seen || !toc_entries.is_empty(),
            toc_entries,
            lists: Vec::new(),
            special_patterns,
        };
        model.lists = self.group_lists(paragraphs, &model);

        log::debug!(
            "Structure: toc={} ({} entries), {} lists, {} special patterns",
            model.has_toc,
            model.toc_entries.len(),
            model.lists.len(),
            model.special_patterns.len()
        );
        model
    }

    // -----------------------------------------------------------------------
    // Table of contents
    // -----------------------------------------------------------------------

    fn find_toc(&self, paragraphs: &[ParagraphRecord]) -> (Vec<TocEntry>, bool) {
        let mut entries = Vec::new();
        let mut state = TocState::Scanning;
        let mut field_seen = false;
        let mut entries_in_block = 0usize;

        for p in paragraphs {
            let mut entered_here = false;
            if p.toc_field_begin {
                field_seen = true;
                if state == TocState::Scanning {
                    entered_here = true;
                }
                state = TocState::InToc;
                entries_in_block = 0;
            }
            if state == TocState::Scanning
                && (self.is_toc_style(p.style_id.as_deref()) || TOC_HEADING_RE.is_match(&p.text))
            {
                log::debug!("TOC starts at paragraph {}", p.index);
                state = TocState::InToc;
                entered_here = true;
                entries_in_block = 0;
            }

            if state == TocState::InToc {
                if let Some(entry) = self.parse_entry(p) {
                    entries.push(entry);
                    entries_in_block += 1;
                } else if !entered_here && self.ends_toc(p, entries_in_block) {
                    log::debug!("TOC ends before paragraph {}", p.index);
                    state = TocState::Scanning;
                }
            }

            if p.toc_field_end && state == TocState::InToc {
                state = TocState::Scanning;
            }
        }
        (entries, field_seen)
    }

    fn ends_toc(&self, p: &ParagraphRecord, entries_in_block: usize) -> bool {
        if self.is_heading_style(p.style_id.as_deref()) && entries_in_block > 0 {
            return true;
        }
        entries_in_block >= self.options.toc_exit_min_entries
            && (p.is_blank() || self.is_normal_style(p.style_id.as_deref()))
    }

    fn parse_entry(&self, p: &ParagraphRecord) -> Option<TocEntry> {
        let text = p.text.trim_end();
        if TOC_HEADING_RE.is_match(text) {
            return None;
        }
        let level = self.toc_level(p.style_id.as_deref());

        if let Some(caps) = TOC_ENTRY_RE.captures(text) {
            let title = clean_title(&caps["text"]);
            if !title.is_empty() {
                let tab_leader = p
                    .tabs
                    .iter()
                    .rev()
                    .find(|t| t.alignment == TabAlignment::Right)
                    .and_then(|t| t.leader.glyph());
                let literal_leader = caps["leader"]
                    .chars()
                    .find(|c| !c.is_whitespace())
                    .map(|c| if c == '…' { '.' } else { c });
                return Some(TocEntry {
                    paragraph_index: p.index,
                    level: level.unwrap_or(1),
                    text: title,
                    page_number: caps["page"].parse().ok(),
                    leader: tab_leader.or(literal_leader),
                });
            }
        }

        // A TOC-styled line without a page number (web layout TOCs).
        if level.is_some() && !p.is_blank() {
            return Some(TocEntry {
                paragraph_index: p.index,
                level: level.unwrap_or(1),
                text: clean_title(text),
                page_number: None,
                leader: None,
            });
        }
        None
    }

    /// Style id reduced to lowercase alphanumerics.
    fn style_key(style_id: &str) -> String {
        style_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }

    fn is_toc_style(&self, style_id: Option<&str>) -> bool {
        let Some(id) = style_id else {
            return false;
        };
        let key = Self::style_key(id);
        self.options
            .toc_style_markers
            .iter()
            .any(|m| key.starts_with(m.as_str()))
    }

    /// `TOC1`..`TOC9` (also `toc 2`) give the entry level; other styles none.
    fn toc_level(&self, style_id: Option<&str>) -> Option<u8> {
        let key = Self::style_key(style_id?);
        let digits = key.strip_prefix("toc")?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u8>().ok().map(|l| l.clamp(1, 9))
    }

    fn is_heading_style(&self, style_id: Option<&str>) -> bool {
        style_id
            .map(|id| {
                let key = Self::style_key(id);
                key.starts_with("heading") || key == "title"
            })
            .unwrap_or(false)
    }

    fn is_normal_style(&self, style_id: Option<&str>) -> bool {
        match style_id {
            None => true,
            Some(id) => {
                id.eq_ignore_ascii_case("normal") || self.normal_style.as_deref() == Some(id)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Lists
    // -----------------------------------------------------------------------

    fn group_lists(&self, paragraphs: &[ParagraphRecord], model: &StructureModel) -> Vec<ListGroup> {
        let toc_paragraphs: HashSet<usize> =
            model.toc_entries.iter().map(|e| e.paragraph_index).collect();
        let mut groups = Vec::new();
        let mut current: Option<ListGroup> = None;
        let mut last_level = 0u8;

        for p in paragraphs {
            if toc_paragraphs.contains(&p.index) {
                groups.extend(current.take());
                continue;
            }
            match p.numbering() {
                Some((num_id, level)) => {
                    if current.as_ref().map(|g| g.num_id.as_str()) != Some(num_id) {
                        groups.extend(current.take());
                        current = Some(ListGroup::new(num_id));
                    }
                    if let Some(group) = current.as_mut() {
                        group.items.push(ListMember {
                            paragraph_index: p.index,
                            level,
                            is_special: false,
                            pattern_kind: None,
                        });
                    }
                    last_level = level;
                }
                None => {
                    let Some(group) = current.as_mut() else {
                        continue;
                    };
                    match self.patterns.classify(&p.text).filter(|k| model.is_promoted(*k)) {
                        Some(kind) => group.items.push(ListMember {
                            paragraph_index: p.index,
                            level: last_level,
                            is_special: true,
                            pattern_kind: Some(kind),
                        }),
                        None => groups.extend(current.take()),
                    }
                }
            }
        }
        groups.extend(current.take());
        groups
    }
}

fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '·' | '…' | '_' | '-' | '\t' | ' '))
        .to_string()
}
