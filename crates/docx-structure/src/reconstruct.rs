//! Turns the flat paragraph stream plus its [`StructureModel`] into an
//! ordered tree: nested list nodes, TOC blocks, and plain paragraphs.
//!
//! Order is always document order. Class names come from
//! [`docx_core::naming`], the same functions the stylesheet uses.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use docx_core::model::{
    ListGroup, ListMember, ParagraphRecord, PatternKind, StructureModel, TocEntry,
};
use docx_core::naming;
use docx_core::options::ConversionOptions;
use docx_styles::level_text;
use docx_styles::numbering::{NumberFormat, NumberingTable, LEVEL_COUNT};

use crate::patterns::{default_rules, PatternTable};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParagraphNode {
    pub paragraph_index: usize,
    pub style_id: Option<String>,
    pub text: String,
    /// Set when the paragraph has a promoted special shape.
    pub special: Option<PatternKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItemNode {
    pub paragraph_index: usize,
    pub level: u8,
    pub class: String,
    pub format: Option<NumberFormat>,
    /// Marker text as Word would display it (`"2.1."`, `"•"`).
    pub marker: Option<String>,
    pub text: String,
    pub sublist: Option<ListNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListEntry {
    Item(ListItemNode),
    /// A non-numbered paragraph carried inside the list.
    Special {
        paragraph_index: usize,
        pattern_kind: Option<PatternKind>,
        text: String,
    },
    /// Deeper items with no preceding item to hang from.
    Nested(ListNode),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListNode {
    pub num_id: String,
    pub level: u8,
    pub class: String,
    pub ordered: bool,
    pub entries: Vec<ListEntry>,
}

impl ListNode {
    pub fn items(&self) -> impl Iterator<Item = &ListItemNode> {
        self.entries.iter().filter_map(|e| match e {
            ListEntry::Item(item) => Some(item),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocLine {
    pub paragraph_index: usize,
    pub level: u8,
    pub text: String,
    pub leader: Option<char>,
    pub page_number: Option<u32>,
    pub class: String,
}

/// One contiguous run of TOC entry paragraphs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TocBlock {
    pub lines: Vec<TocLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocNode {
    Paragraph(ParagraphNode),
    List(ListNode),
    Toc(TocBlock),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReconstructedDocument {
    pub nodes: Vec<DocNode>,
}

impl ReconstructedDocument {
    pub fn lists(&self) -> impl Iterator<Item = &ListNode> {
        self.nodes.iter().filter_map(|n| match n {
            DocNode::List(l) => Some(l),
            _ => None,
        })
    }

    pub fn tocs(&self) -> impl Iterator<Item = &TocBlock> {
        self.nodes.iter().filter_map(|n| match n {
            DocNode::Toc(t) => Some(t),
            _ => None,
        })
    }

    /// The first TOC block.
    pub fn toc(&self) -> Option<&TocBlock> {
        self.tocs().next()
    }
}

/// Running counters per numbering instance, so a list interrupted by other
/// paragraphs continues where it stopped, as Word does.
#[derive(Default)]
struct Counters {
    by_num: HashMap<String, [Option<u32>; LEVEL_COUNT]>,
}

pub struct Reconstructor<'a> {
    numbering: &'a NumberingTable,
    prefix: &'a str,
    patterns: PatternTable,
}

impl<'a> Reconstructor<'a> {
    pub fn new(numbering: &'a NumberingTable, options: &'a ConversionOptions) -> Self {
        Self {
            numbering,
            prefix: &options.class_prefix,
            patterns: PatternTable::new(
                default_rules(options.pattern_min_occurrences),
                options.pattern_max_length,
            ),
        }
    }

    pub fn build(&self, paragraphs: &[ParagraphRecord], model: &StructureModel) -> ReconstructedDocument {
        let by_index: HashMap<usize, &ParagraphRecord> =
            paragraphs.iter().map(|p| (p.index, p)).collect();
        let toc_entries: HashMap<usize, &TocEntry> =
            model.toc_entries.iter().map(|e| (e.paragraph_index, e)).collect();
        let list_start: HashMap<usize, &ListGroup> = model
            .lists
            .iter()
            .filter_map(|g| g.items.first().map(|m| (m.paragraph_index, g)))
            .collect();
        let in_list: HashSet<usize> = model
            .lists
            .iter()
            .flat_map(|g| g.items.iter().map(|m| m.paragraph_index))
            .collect();

        let mut counters = Counters::default();
        let mut nodes = Vec::new();
        let mut previous_was_toc = false;

        for p in paragraphs {
            if let Some(entry) = toc_entries.get(&p.index) {
                let line = self.toc_line(entry);
                match nodes.last_mut() {
                    Some(DocNode::Toc(block)) if previous_was_toc => block.lines.push(line),
                    _ => nodes.push(DocNode::Toc(TocBlock { lines: vec![line] })),
                }
                previous_was_toc = true;
                continue;
            }
            previous_was_toc = false;
            if let Some(group) = list_start.get(&p.index) {
                nodes.push(DocNode::List(self.list_group(group, &by_index, &mut counters)));
                continue;
            }
            if in_list.contains(&p.index) {
                continue;
            }
            let special = self
                .patterns
                .classify(&p.text)
                .filter(|k| model.is_promoted(*k));
            nodes.push(DocNode::Paragraph(ParagraphNode {
                paragraph_index: p.index,
                style_id: p.style_id.clone(),
                text: p.text.clone(),
                special,
            }));
        }

        ReconstructedDocument { nodes }
    }

    fn toc_line(&self, e: &TocEntry) -> TocLine {
        TocLine {
            paragraph_index: e.paragraph_index,
            level: e.level,
            text: e.text.clone(),
            leader: e.leader,
            page_number: e.page_number,
            class: naming::toc_class(self.prefix, e.level),
        }
    }

    fn list_group(
        &self,
        group: &ListGroup,
        by_index: &HashMap<usize, &ParagraphRecord>,
        counters: &mut Counters,
    ) -> ListNode {
        let base = group
            .items
            .iter()
            .filter(|m| !m.is_special)
            .map(|m| m.level)
            .min()
            .unwrap_or(0);
        self.list_node(&group.num_id, &group.items, base, true, by_index, counters)
    }

    fn list_node(
        &self,
        num_id: &str,
        members: &[ListMember],
        base: u8,
        root: bool,
        by_index: &HashMap<usize, &ParagraphRecord>,
        counters: &mut Counters,
    ) -> ListNode {
        let text_of = |idx: usize| by_index.get(&idx).map(|p| p.text.clone()).unwrap_or_default();
        let mut entries: Vec<ListEntry> = Vec::new();
        let mut i = 0;

        while i < members.len() {
            let m = &members[i];
            if m.level > base {
                // Maximal run of deeper members.
                let end = members[i..]
                    .iter()
                    .position(|n| n.level <= base)
                    .map(|p| i + p)
                    .unwrap_or(members.len());
                let run = &members[i..end];
                let nested_base = run
                    .iter()
                    .filter(|n| !n.is_special)
                    .map(|n| n.level)
                    .min()
                    .unwrap_or(run[0].level);
                let nested = self.list_node(num_id, run, nested_base, false, by_index, counters);
                match entries.last_mut() {
                    Some(ListEntry::Item(item)) if item.sublist.is_none() => {
                        item.sublist = Some(nested);
                    }
                    _ => entries.push(ListEntry::Nested(nested)),
                }
                i = end;
                continue;
            }

            if m.is_special {
                entries.push(ListEntry::Special {
                    paragraph_index: m.paragraph_index,
                    pattern_kind: m.pattern_kind,
                    text: text_of(m.paragraph_index),
                });
            } else {
                let effective = self.numbering.effective_level(num_id, m.level);
                entries.push(ListEntry::Item(ListItemNode {
                    paragraph_index: m.paragraph_index,
                    level: m.level,
                    class: naming::item_class(self.prefix, num_id, m.level),
                    format: effective.as_ref().map(|e| e.def.format),
                    marker: self.advance(num_id, m.level, counters),
                    text: text_of(m.paragraph_index),
                    sublist: None,
                }));
            }
            i += 1;
        }

        let ordered = self
            .numbering
            .effective_level(num_id, base)
            .map(|e| e.def.format.is_ordered())
            .unwrap_or(true);

        ListNode {
            num_id: num_id.to_string(),
            level: base,
            class: if root {
                naming::list_class(self.prefix, num_id)
            } else {
                naming::sublist_class(self.prefix, num_id, base)
            },
            ordered,
            entries,
        }
    }

    /// Step the counter of `(num_id, level)`, reset dependent deeper levels,
    /// and render the marker text.
    fn advance(&self, num_id: &str, level: u8, counters: &mut Counters) -> Option<String> {
        let effective = self.numbering.effective_level(num_id, level)?;
        let state = counters
            .by_num
            .entry(num_id.to_string())
            .or_insert([None; LEVEL_COUNT]);

        let lvl = level as usize;
        state[lvl] = Some(match state[lvl] {
            Some(n) => n.saturating_add(1),
            None => effective.start(),
        });
        for deeper in (lvl + 1)..LEVEL_COUNT {
            let restarts = self
                .numbering
                .effective_level(num_id, deeper as u8)
                .map(|d| d.def.restarts_after(level))
                .unwrap_or(true);
            if restarts {
                state[deeper] = None;
            }
        }

        let text = effective.def.level_text();
        if text.is_literal() {
            return Some(level_text::display_literal(
                text.literal.as_deref().unwrap_or_default(),
            ));
        }
        let snapshot = *state;
        Some(text.render(|l| {
            let lvl = self.numbering.effective_level(num_id, l);
            let start = lvl.as_ref().map(|e| e.start()).unwrap_or(1);
            let value = snapshot[l as usize].unwrap_or(start);
            let format = match lvl {
                Some(_) if effective.def.is_legal => NumberFormat::Decimal,
                Some(e) => e.def.format,
                None => NumberFormat::Decimal,
            };
            format.format(value)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::StructureAnalyzer;
    use docx_utils::xml::{Namespaces, XmlDocument};
    use docx_core::error::Diagnostics;

    fn numbering() -> NumberingTable {
        let xml = r#"<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
          <w:abstractNum w:abstractNumId="0">
            <w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/></w:lvl>
            <w:lvl w:ilvl="1"><w:start w:val="1"/><w:numFmt w:val="lowerLetter"/><w:lvlText w:val="%1.%2"/></w:lvl>
          </w:abstractNum>
          <w:abstractNum w:abstractNumId="1">
            <w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/><w:lvlText w:val="&#xF0B7;"/></w:lvl>
          </w:abstractNum>
          <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
          <w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>
        </w:numbering>"#;
        let doc = XmlDocument::parse(xml, &Namespaces::ooxml()).unwrap();
        NumberingTable::from_xml(&doc, &mut Diagnostics::new())
    }

    fn rebuild(paragraphs: &[ParagraphRecord]) -> ReconstructedDocument {
        let options = ConversionOptions::default();
        let model = StructureAnalyzer::new(&options).analyze(paragraphs);
        let table = numbering();
        Reconstructor::new(&table, &options).build(paragraphs, &model)
    }

    #[test]
    fn test_nested_regrouping() {
        let paragraphs = vec![
            ParagraphRecord::new(0, "first").with_numbering("1", 0),
            ParagraphRecord::new(1, "first.a").with_numbering("1", 1),
            ParagraphRecord::new(2, "second").with_numbering("1", 0),
        ];
        let doc = rebuild(&paragraphs);
        assert_eq!(doc.nodes.len(), 1);
        let list = doc.lists().next().unwrap();
        assert_eq!(list.class, "docx-list-1");
        assert!(list.ordered);
        let items: Vec<&ListItemNode> = list.items().collect();
        assert_eq!(items.len(), 2);
        let sub = items[0].sublist.as_ref().unwrap();
        assert_eq!(sub.items().count(), 1);
        assert_eq!(sub.class, "docx-list-1-1");
        assert!(items[1].sublist.is_none());

        assert_eq!(items[0].marker.as_deref(), Some("1."));
        assert_eq!(sub.items().next().unwrap().marker.as_deref(), Some("1.a"));
        assert_eq!(sub.items().next().unwrap().class, "docx-num-1-1");
        assert_eq!(items[1].marker.as_deref(), Some("2."));
    }

    #[test]
    fn test_orphaned_deeper_run() {
        let paragraphs = vec![
            ParagraphRecord::new(0, "deep first").with_numbering("1", 1),
            ParagraphRecord::new(1, "top").with_numbering("1", 0),
        ];
        // Base level is 0, so the leading level-1 item has nothing to hang from.
        let doc = rebuild(&paragraphs);
        let list = doc.lists().next().unwrap();
        assert!(matches!(list.entries[0], ListEntry::Nested(_)));
        assert!(matches!(list.entries[1], ListEntry::Item(_)));
    }

    #[test]
    fn test_counters_continue_across_groups() {
        let paragraphs = vec![
            ParagraphRecord::new(0, "a").with_numbering("1", 0),
            ParagraphRecord::new(1, "b").with_numbering("1", 1),
            ParagraphRecord::new(2, "interruption"),
            ParagraphRecord::new(3, "c").with_numbering("1", 0),
            ParagraphRecord::new(4, "d").with_numbering("1", 1),
        ];
        let doc = rebuild(&paragraphs);
        let lists: Vec<&ListNode> = doc.lists().collect();
        assert_eq!(lists.len(), 2);
        let second: Vec<&ListItemNode> = lists[1].items().collect();
        assert_eq!(second[0].marker.as_deref(), Some("2."));
        // Level 1 restarted when level 0 advanced.
        let nested = second[0].sublist.as_ref().unwrap();
        assert_eq!(nested.items().next().unwrap().marker.as_deref(), Some("2.a"));
    }

    #[test]
    fn test_bullet_marker_and_unordered() {
        let paragraphs = vec![ParagraphRecord::new(0, "point").with_numbering("2", 0)];
        let doc = rebuild(&paragraphs);
        let list = doc.lists().next().unwrap();
        assert!(!list.ordered);
        let item = list.items().next().unwrap();
        assert_eq!(item.format, Some(NumberFormat::Bullet));
        assert_eq!(item.marker.as_deref(), Some("\u{2022}"));
    }

    #[test]
    fn test_unresolvable_numbering_still_lists() {
        let paragraphs = vec![ParagraphRecord::new(0, "x").with_numbering("99", 0)];
        let doc = rebuild(&paragraphs);
        let item = doc.lists().next().unwrap().items().next().unwrap().clone();
        assert_eq!(item.format, None);
        assert_eq!(item.marker, None);
    }

    #[test]
    fn test_toc_block_and_specials_in_document_order() {
        let mut first = ParagraphRecord::new(1, "Scope\t1");
        first.toc_field_begin = true;
        let mut second = ParagraphRecord::new(2, "Terms\t2").with_style("TOC2");
        second.toc_field_end = true;
        let paragraphs = vec![
            ParagraphRecord::new(0, "Contents"),
            first,
            second,
            ParagraphRecord::new(3, "Rationale for one"),
            ParagraphRecord::new(4, "item").with_numbering("1", 0),
            ParagraphRecord::new(5, "Rationale for two"),
            ParagraphRecord::new(6, "Body text."),
        ];
        let doc = rebuild(&paragraphs);
        assert_eq!(doc.nodes.len(), 5);
        // "Contents" opened the TOC but is not itself an entry.
        assert!(matches!(doc.nodes[0], DocNode::Paragraph(_)));
        let toc = doc.toc().unwrap();
        assert_eq!(toc.lines.len(), 2);
        assert_eq!(toc.lines[1].class, "docx-toc-2");
        assert_eq!(toc.lines[1].page_number, Some(2));
        match &doc.nodes[2] {
            DocNode::Paragraph(p) => assert_eq!(p.special, Some(PatternKind::WordForWord)),
            other => panic!("unexpected node {:?}", other),
        }
        let list = doc.lists().next().unwrap();
        assert!(matches!(
            list.entries[1],
            ListEntry::Special {
                pattern_kind: Some(PatternKind::WordForWord),
                ..
            }
        ));
        match &doc.nodes[4] {
            DocNode::Paragraph(p) => assert_eq!(p.special, None),
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_toc_entry_from_model_only() {
        let paragraphs = vec![ParagraphRecord::new(0, "Intro")];
        let model = StructureModel {
            has_toc: true,
            toc_entries: vec![TocEntry {
                paragraph_index: 0,
                level: 1,
                text: "Intro".into(),
                page_number: None,
                leader: None,
            }],
            ..Default::default()
        };
        let options = ConversionOptions::default();
        let table = numbering();
        let doc = Reconstructor::new(&table, &options).build(&paragraphs, &model);
        assert_eq!(doc.toc().unwrap().lines[0].class, "docx-toc-1");
    }

    #[test]
    fn test_separate_toc_fields_keep_their_positions() {
        let mut a = ParagraphRecord::new(0, "Scope\t1");
        a.toc_field_begin = true;
        let mut b = ParagraphRecord::new(1, "Terms\t2");
        b.toc_field_end = true;
        let mut c = ParagraphRecord::new(3, "Figure 1\t7");
        c.toc_field_begin = true;
        let mut d = ParagraphRecord::new(4, "Figure 2\t9");
        d.toc_field_end = true;
        let paragraphs = vec![a, b, ParagraphRecord::new(2, "Body text."), c, d];

        let doc = rebuild(&paragraphs);
        assert_eq!(doc.nodes.len(), 3);
        match (&doc.nodes[0], &doc.nodes[1], &doc.nodes[2]) {
            (DocNode::Toc(first), DocNode::Paragraph(body), DocNode::Toc(second)) => {
                let firsts: Vec<usize> = first.lines.iter().map(|l| l.paragraph_index).collect();
                let seconds: Vec<usize> = second.lines.iter().map(|l| l.paragraph_index).collect();
                assert_eq!(firsts, vec![0, 1]);
                assert_eq!(body.paragraph_index, 2);
                assert_eq!(seconds, vec![3, 4]);
            }
            other => panic!("unexpected nodes {:?}", other),
        }
        assert_eq!(doc.tocs().count(), 2);
    }

    #[test]
    fn test_counter_at_upper_bound_does_not_overflow() {
        let xml = r#"<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
          <w:abstractNum w:abstractNumId="0">
            <w:lvl w:ilvl="0"><w:start w:val="4294967295"/><w:numFmt w:val="lowerLetter"/><w:lvlText w:val="%1)"/></w:lvl>
          </w:abstractNum>
          <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
        </w:numbering>"#;
        let doc = XmlDocument::parse(xml, &Namespaces::ooxml()).unwrap();
        let table = NumberingTable::from_xml(&doc, &mut Diagnostics::new());
        let paragraphs: Vec<ParagraphRecord> = (0..3)
            .map(|i| ParagraphRecord::new(i, "x").with_numbering("1", 0))
            .collect();

        let mut counters = Counters::default();
        let mut state = [None; LEVEL_COUNT];
        state[0] = Some(u32::MAX);
        counters.by_num.insert("1".into(), state);
        let options = ConversionOptions::default();
        let rebuilt = Reconstructor::new(&table, &options);
        assert_eq!(rebuilt.advance("1", 0, &mut counters).as_deref(), Some("4294967295)"));

        let model = StructureAnalyzer::new(&options).analyze(&paragraphs);
        let out = rebuilt.build(&paragraphs, &model);
        let markers: Vec<String> = out
            .lists()
            .flat_map(|l| l.items())
            .filter_map(|i| i.marker.clone())
            .collect();
        // The out-of-range start is dropped when parsed.
        assert_eq!(markers.len(), 3);
        assert!(markers.iter().all(|m| m.len() < 1300));
    }
}
