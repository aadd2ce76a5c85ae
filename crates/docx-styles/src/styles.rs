//! Style table built from `word/styles.xml`.
//!
//! Styles are kept per kind in id-keyed maps. `basedOn` is a weak reference:
//! it is only followed at resolution time, through a visited-set walk with a
//! hop limit, so cycles and dangling links degrade to a shorter chain.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use docx_core::error::{DiagnosticKind, Diagnostics};
use docx_utils::xml::{val_of, Element, XmlDocument};

use crate::props::{ParagraphProps, RunProps, TableProps};

const PART: &str = "styles";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleKind {
    Paragraph,
    Character,
    Table,
    Numbering,
}

impl StyleKind {
    pub fn from_word(val: &str) -> Option<Self> {
        match val {
            "paragraph" => Some(StyleKind::Paragraph),
            "character" => Some(StyleKind::Character),
            "table" => Some(StyleKind::Table),
            "numbering" => Some(StyleKind::Numbering),
            _ => None,
        }
    }

    pub const ALL: [StyleKind; 4] = [
        StyleKind::Paragraph,
        StyleKind::Character,
        StyleKind::Table,
        StyleKind::Numbering,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleRecord {
    pub id: String,
    pub kind: StyleKind,
    pub name: Option<String>,
    pub based_on: Option<String>,
    pub is_default: bool,
    pub run: RunProps,
    pub paragraph: ParagraphProps,
    pub table: TableProps,
}

impl StyleRecord {
    fn parse(el: &Element<'_>) -> Result<Self, String> {
        let id = el
            .attr("w:styleId")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "w:style without w:styleId".to_string())?;

        // Word treats a missing w:type as a paragraph style.
        let kind = match el.attr("w:type") {
            None => StyleKind::Paragraph,
            Some(t) => StyleKind::from_word(t)
                .ok_or_else(|| format!("style {:?} has unknown type {:?}", id, t))?,
        };

        Ok(Self {
            id: id.to_string(),
            kind,
            name: val_of(el, "w:name").map(|s| s.to_string()),
            based_on: val_of(el, "w:basedOn")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
            is_default: matches!(el.attr("w:default"), Some("1" | "true" | "on")),
            run: el.child("w:rPr").map(|r| RunProps::parse(&r)).unwrap_or_default(),
            paragraph: el
                .child("w:pPr")
                .map(|p| ParagraphProps::parse(&p))
                .unwrap_or_default(),
            table: el
                .child("w:tblPr")
                .map(|t| TableProps::parse(&t))
                .unwrap_or_default(),
        })
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// `w:docDefaults`: formatting applied beneath every style.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DocDefaults {
    pub run: RunProps,
    pub paragraph: ParagraphProps,
}

impl DocDefaults {
    fn parse(el: &Element<'_>) -> Self {
        Self {
            run: el
                .path("w:rPrDefault/w:rPr")
                .map(|r| RunProps::parse(&r))
                .unwrap_or_default(),
            paragraph: el
                .path("w:pPrDefault/w:pPr")
                .map(|p| ParagraphProps::parse(&p))
                .unwrap_or_default(),
        }
    }
}

/// Why a `basedOn` walk stopped before reaching a style without a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainBreak {
    Cycle(String),
    Dangling(String),
    KindMismatch(String),
    DepthLimit,
}

/// Formatting of a style after merging its `basedOn` ancestors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveStyle {
    pub id: String,
    pub kind: StyleKind,
    pub run: RunProps,
    pub paragraph: ParagraphProps,
    pub table: TableProps,
    /// Ids from the style itself up to the furthest ancestor reached.
    pub chain: Vec<String>,
    pub truncated: Option<ChainBreak>,
}

impl EffectiveStyle {
    /// Layer the document defaults underneath.
    pub fn with_defaults(&self, defaults: &DocDefaults) -> EffectiveStyle {
        EffectiveStyle {
            run: defaults.run.merged(&self.run),
            paragraph: defaults.paragraph.merged(&self.paragraph),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StyleTable {
    pub paragraph: BTreeMap<String, StyleRecord>,
    pub character: BTreeMap<String, StyleRecord>,
    pub table: BTreeMap<String, StyleRecord>,
    pub numbering: BTreeMap<String, StyleRecord>,
    pub doc_defaults: DocDefaults,
    pub default_paragraph: Option<String>,
    pub default_character: Option<String>,
    pub default_table: Option<String>,
}

impl StyleTable {
    /// Build the table from a parsed styles part. Malformed styles are
    /// skipped; each skip and each broken `basedOn` link is recorded.
    pub fn from_xml(doc: &XmlDocument, diagnostics: &mut Diagnostics) -> Self {
        let root = doc.root();
        let mut table = StyleTable::default();

        if !root.is("w:styles") {
            diagnostics.push(
                DiagnosticKind::MalformedNode,
                PART,
                format!("unexpected root element <{}>", root.local_name()),
            );
            return table;
        }

        if let Some(defaults) = root.child("w:docDefaults") {
            table.doc_defaults = DocDefaults::parse(&defaults);
        }

        for el in root.children_named("w:style") {
            let record = match StyleRecord::parse(&el) {
                Ok(r) => r,
                Err(msg) => {
                    diagnostics.push(DiagnosticKind::MalformedNode, PART, msg);
                    continue;
                }
            };
            if record.is_default {
                let slot = match record.kind {
                    StyleKind::Paragraph => Some(&mut table.default_paragraph),
                    StyleKind::Character => Some(&mut table.default_character),
                    StyleKind::Table => Some(&mut table.default_table),
                    StyleKind::Numbering => None,
                };
                if let Some(slot) = slot {
                    slot.get_or_insert_with(|| record.id.clone());
                }
            }
            let map = table.map_mut(record.kind);
            if map.contains_key(&record.id) {
                diagnostics.push(
                    DiagnosticKind::MalformedNode,
                    PART,
                    format!("duplicate style id {:?}, keeping the first", record.id),
                );
                continue;
            }
            map.insert(record.id.clone(), record);
        }

        table.check_links(diagnostics);
        log::debug!(
            "Style table: {} paragraph, {} character, {} table, {} numbering styles",
            table.paragraph.len(),
            table.character.len(),
            table.table.len(),
            table.numbering.len()
        );
        table
    }

    fn check_links(&self, diagnostics: &mut Diagnostics) {
        for record in self.iter() {
            let Some(parent) = &record.based_on else {
                continue;
            };
            if self.get(record.kind, parent).is_none() {
                let message = match self.find(parent) {
                    Some(other) => format!(
                        "style {:?} is based on {:?}, a {:?} style",
                        record.id, parent, other.kind
                    ),
                    None => format!("style {:?} is based on missing style {:?}", record.id, parent),
                };
                diagnostics.push(DiagnosticKind::UnresolvableReference, PART, message);
            }
        }
    }

    pub fn map(&self, kind: StyleKind) -> &BTreeMap<String, StyleRecord> {
        match kind {
            StyleKind::Paragraph => &self.paragraph,
            StyleKind::Character => &self.character,
            StyleKind::Table => &self.table,
            StyleKind::Numbering => &self.numbering,
        }
    }

    fn map_mut(&mut self, kind: StyleKind) -> &mut BTreeMap<String, StyleRecord> {
        match kind {
            StyleKind::Paragraph => &mut self.paragraph,
            StyleKind::Character => &mut self.character,
            StyleKind::Table => &mut self.table,
            StyleKind::Numbering => &mut self.numbering,
        }
    }

    pub fn get(&self, kind: StyleKind, id: &str) -> Option<&StyleRecord> {
        self.map(kind).get(id)
    }

    /// Look an id up across all kinds, paragraph styles first.
    pub fn find(&self, id: &str) -> Option<&StyleRecord> {
        StyleKind::ALL.iter().find_map(|k| self.get(*k, id))
    }

    /// All records, grouped by kind, ids sorted within each kind.
    pub fn iter(&self) -> impl Iterator<Item = &StyleRecord> {
        StyleKind::ALL.into_iter().flat_map(move |k| self.map(k).values())
    }

    pub fn len(&self) -> usize {
        StyleKind::ALL.iter().map(|k| self.map(*k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge `id` with its `basedOn` ancestors, root first, child winning.
    ///
    /// The walk stops at a cycle, a dangling link, a parent of another kind,
    /// or after `max_depth` hops; whatever was collected up to that point is
    /// still merged.
    pub fn resolve_effective(&self, id: &str, max_depth: usize) -> Option<EffectiveStyle> {
        self.find(id).map(|start| self.resolve_record(start, max_depth))
    }

    /// [`resolve_effective`](Self::resolve_effective) restricted to one kind,
    /// for ids that exist under several kinds.
    pub fn resolve_effective_kind(
        &self,
        kind: StyleKind,
        id: &str,
        max_depth: usize,
    ) -> Option<EffectiveStyle> {
        self.get(kind, id).map(|start| self.resolve_record(start, max_depth))
    }

    fn resolve_record(&self, start: &StyleRecord, max_depth: usize) -> EffectiveStyle {
        let id = start.id.as_str();
        let mut chain: Vec<&StyleRecord> = vec![start];
        let mut visited: HashSet<&str> = HashSet::from([start.id.as_str()]);
        let mut truncated = None;

        let mut current = start;
        while let Some(parent_id) = current.based_on.as_deref() {
            if chain.len() > max_depth {
                truncated = Some(ChainBreak::DepthLimit);
                break;
            }
            if visited.contains(parent_id) {
                log::debug!("basedOn cycle at {:?} while resolving {:?}", parent_id, id);
                truncated = Some(ChainBreak::Cycle(parent_id.to_string()));
                break;
            }
            let Some(parent) = self.get(start.kind, parent_id) else {
                truncated = Some(if self.find(parent_id).is_some() {
                    ChainBreak::KindMismatch(parent_id.to_string())
                } else {
                    ChainBreak::Dangling(parent_id.to_string())
                });
                break;
            };
            visited.insert(parent.id.as_str());
            chain.push(parent);
            current = parent;
        }

        let mut run = RunProps::default();
        let mut paragraph = ParagraphProps::default();
        let mut table = TableProps::default();
        for record in chain.iter().rev() {
            run = run.merged(&record.run);
            paragraph = paragraph.merged(&record.paragraph);
            table = table.merged(&record.table);
        }

        EffectiveStyle {
            id: start.id.clone(),
            kind: start.kind,
            run,
            paragraph,
            table,
            chain: chain.iter().map(|r| r.id.clone()).collect(),
            truncated,
        }
    }

    /// The style's own formatting without following `basedOn`.
    pub fn direct(&self, id: &str) -> Option<EffectiveStyle> {
        self.find(id).map(Self::direct_record)
    }

    pub fn direct_kind(&self, kind: StyleKind, id: &str) -> Option<EffectiveStyle> {
        self.get(kind, id).map(Self::direct_record)
    }

    fn direct_record(record: &StyleRecord) -> EffectiveStyle {
        EffectiveStyle {
            id: record.id.clone(),
            kind: record.kind,
            run: record.run.clone(),
            paragraph: record.paragraph.clone(),
            table: record.table.clone(),
            chain: vec![record.id.clone()],
            truncated: None,
        }
    }

    /// Whether a paragraph style id denotes the document's body text style.
    pub fn is_normal(&self, id: &str) -> bool {
        self.default_paragraph.as_deref() == Some(id) || id.eq_ignore_ascii_case("normal")
    }
}
