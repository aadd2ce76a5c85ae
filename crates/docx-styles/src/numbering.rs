//! Numbering definitions from `word/numbering.xml`.
//!
//! Abstract definitions hold up to nine levels; numbering instances (`w:num`)
//! point at one abstract definition and may override individual levels,
//! either wholesale (`w:lvl`) or by start value only (`w:startOverride`).

use std::collections::BTreeMap;

use serde::Serialize;

use docx_core::error::{DiagnosticKind, Diagnostics};
use docx_utils::xml::{int_attr, on_off, val_of, Element, XmlDocument};

use crate::level_text::{self, LevelText};
use crate::props::{Alignment, Indentation, RunProps};

const PART: &str = "numbering";

pub const LEVEL_COUNT: usize = 9;

/// Largest start value Word accepts; larger declarations are clamped.
pub const MAX_START: u32 = 32767;

fn clamp_start(value: i64) -> u32 {
    value.clamp(0, MAX_START as i64) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    Decimal,
    DecimalZero,
    LowerLetter,
    UpperLetter,
    LowerRoman,
    UpperRoman,
    Bullet,
    None,
}

impl NumberFormat {
    pub fn from_word(val: &str) -> Self {
        match val {
            "decimal" => NumberFormat::Decimal,
            "decimalZero" => NumberFormat::DecimalZero,
            "lowerLetter" => NumberFormat::LowerLetter,
            "upperLetter" => NumberFormat::UpperLetter,
            "lowerRoman" => NumberFormat::LowerRoman,
            "upperRoman" => NumberFormat::UpperRoman,
            "bullet" => NumberFormat::Bullet,
            "none" => NumberFormat::None,
            other => {
                log::debug!("Unsupported number format {:?}, using decimal", other);
                NumberFormat::Decimal
            }
        }
    }

    /// `list-style-type` keyword used for `counter()` in generated CSS.
    pub fn css_list_style(self) -> &'static str {
        match self {
            NumberFormat::Decimal => "decimal",
            NumberFormat::DecimalZero => "decimal-leading-zero",
            NumberFormat::LowerLetter => "lower-alpha",
            NumberFormat::UpperLetter => "upper-alpha",
            NumberFormat::LowerRoman => "lower-roman",
            NumberFormat::UpperRoman => "upper-roman",
            NumberFormat::Bullet => "disc",
            NumberFormat::None => "none",
        }
    }

    pub fn is_ordered(self) -> bool {
        !matches!(self, NumberFormat::Bullet | NumberFormat::None)
    }

    /// Text of counter value `n` in this format.
    /// Letter and roman forms grow with `n`, so counters past
    /// [`MAX_START`] fall back to decimal.
    pub fn format(self, n: u32) -> String {
        if n > MAX_START && self.is_ordered() {
            return n.to_string();
        }
        match self {
            NumberFormat::Decimal => n.to_string(),
            NumberFormat::DecimalZero => format!("{:02}", n),
            NumberFormat::LowerLetter => letters(n),
            NumberFormat::UpperLetter => letters(n).to_uppercase(),
            NumberFormat::LowerRoman => roman(n),
            NumberFormat::UpperRoman => roman(n).to_uppercase(),
            NumberFormat::Bullet | NumberFormat::None => String::new(),
        }
    }
}

/// Word letter numbering: a..z, then aa..zz, aaa..zzz.
fn letters(n: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let idx = (n - 1) % 26;
    let repeat = (n - 1) / 26 + 1;
    let c = (b'a' + idx as u8) as char;
    std::iter::repeat(c).take(repeat as usize).collect()
}

fn roman(mut n: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    const TABLE: [(u32, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, digits) in TABLE {
        while n >= value {
            out.push_str(digits);
            n -= value;
        }
    }
    out
}

/// What follows the marker before the paragraph text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSuffix {
    #[default]
    Tab,
    Space,
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelDef {
    pub level: u8,
    pub format: NumberFormat,
    pub text_pattern: String,
    pub alignment: Option<Alignment>,
    pub indentation: Indentation,
    pub start: u32,
    /// Raw `w:lvlRestart`: `None` restarts after any higher level, `Some(0)`
    /// never restarts, `Some(r)` restarts after levels `0..r`.
    pub restart_after_level: Option<u8>,
    pub is_legal: bool,
    pub suffix: LevelSuffix,
    pub marker_run: RunProps,
    pub paragraph_style: Option<String>,
}

impl LevelDef {
    pub fn new(level: u8) -> Self {
        Self {
            level,
            format: NumberFormat::Decimal,
            text_pattern: format!("%{}.", level + 1),
            alignment: None,
            indentation: Indentation::default(),
            start: 1,
            restart_after_level: None,
            is_legal: false,
            suffix: LevelSuffix::Tab,
            marker_run: RunProps::default(),
            paragraph_style: None,
        }
    }

    fn parse(el: &Element<'_>) -> Result<Self, String> {
        let level = int_attr(el, "w:ilvl")
            .ok_or_else(|| "w:lvl without w:ilvl".to_string())?;
        let level = u8::try_from(level)
            .ok()
            .filter(|l| (*l as usize) < LEVEL_COUNT)
            .ok_or_else(|| format!("w:lvl level {} out of range", level))?;

        let mut def = LevelDef::new(level);
        if let Some(start) = el.child("w:start").and_then(|s| int_attr(&s, "w:val")) {
            def.start = clamp_start(start);
        }
        if let Some(fmt) = val_of(el, "w:numFmt") {
            def.format = NumberFormat::from_word(fmt);
        }
        if let Some(text) = el.child("w:lvlText") {
            // An lvlText without w:val is an empty marker.
            def.text_pattern = text.attr("w:val").unwrap_or_default().to_string();
        }
        def.alignment = val_of(el, "w:lvlJc").and_then(Alignment::from_word);
        if let Some(restart) = el.child("w:lvlRestart").and_then(|r| int_attr(&r, "w:val")) {
            def.restart_after_level = u8::try_from(restart.clamp(0, LEVEL_COUNT as i64)).ok();
        }
        def.is_legal = on_off(el, "w:isLgl").unwrap_or(false);
        def.suffix = match val_of(el, "w:suff") {
            Some("space") => LevelSuffix::Space,
            Some("nothing") => LevelSuffix::Nothing,
            _ => LevelSuffix::Tab,
        };
        if let Some(ind) = el.path("w:pPr/w:ind") {
            def.indentation = Indentation::parse(&ind);
        }
        if let Some(rpr) = el.child("w:rPr") {
            def.marker_run = RunProps::parse(&rpr);
        }
        def.paragraph_style = val_of(el, "w:pStyle").map(|s| s.to_string());
        Ok(def)
    }

    pub fn level_text(&self) -> LevelText {
        level_text::parse(&self.text_pattern)
    }

    /// Whether this level's counter restarts when the counter of the higher
    /// (smaller-index) level `higher` advances.
    pub fn restarts_after(&self, higher: u8) -> bool {
        if higher >= self.level {
            return false;
        }
        match self.restart_after_level {
            None => true,
            Some(0) => false,
            Some(r) => higher < r,
        }
    }
}

pub type LevelSet = [Option<LevelDef>; LEVEL_COUNT];

fn parse_levels(parent: &Element<'_>, diagnostics: &mut Diagnostics, owner: &str) -> LevelSet {
    let mut levels: LevelSet = Default::default();
    for lvl in parent.children_named("w:lvl") {
        match LevelDef::parse(&lvl) {
            Ok(def) => {
                let slot = def.level as usize;
                levels[slot] = Some(def);
            }
            Err(msg) => diagnostics.push(
                DiagnosticKind::MalformedNode,
                PART,
                format!("{}: {}", owner, msg),
            ),
        }
    }
    levels
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbstractNumbering {
    pub id: String,
    pub multi_level_type: Option<String>,
    /// This definition is the one a numbering style points at.
    pub style_link: Option<String>,
    /// This definition borrows its levels from a numbering style.
    pub num_style_link: Option<String>,
    pub levels: LevelSet,
}

impl AbstractNumbering {
    pub fn has_levels(&self) -> bool {
        self.levels.iter().any(Option::is_some)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LevelOverride {
    pub start_override: Option<u32>,
    pub level: Option<LevelDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberingInstance {
    pub num_id: String,
    pub abstract_num_id: String,
    pub overrides: [Option<LevelOverride>; LEVEL_COUNT],
}

/// Where the definition of an effective level came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSource {
    Abstract,
    Override,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveLevel {
    pub num_id: String,
    pub abstract_num_id: String,
    /// Definition with any start override already applied.
    pub def: LevelDef,
    pub source: LevelSource,
    pub start_overridden: bool,
}

impl EffectiveLevel {
    pub fn level(&self) -> u8 {
        self.def.level
    }

    pub fn start(&self) -> u32 {
        self.def.start
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NumberingTable {
    pub abstracts: BTreeMap<String, AbstractNumbering>,
    pub instances: BTreeMap<String, NumberingInstance>,
}

impl NumberingTable {
    pub fn from_xml(doc: &XmlDocument, diagnostics: &mut Diagnostics) -> Self {
        let root = doc.root();
        let mut table = NumberingTable::default();

        if !root.is("w:numbering") {
            diagnostics.push(
                DiagnosticKind::MalformedNode,
                PART,
                format!("unexpected root element <{}>", root.local_name()),
            );
            return table;
        }

        for el in root.children_named("w:abstractNum") {
            let Some(id) = el.attr("w:abstractNumId") else {
                diagnostics.push(
                    DiagnosticKind::MalformedNode,
                    PART,
                    "w:abstractNum without w:abstractNumId",
                );
                continue;
            };
            let owner = format!("abstractNum {}", id);
            let def = AbstractNumbering {
                id: id.to_string(),
                multi_level_type: val_of(&el, "w:multiLevelType").map(|s| s.to_string()),
                style_link: val_of(&el, "w:styleLink").map(|s| s.to_string()),
                num_style_link: val_of(&el, "w:numStyleLink").map(|s| s.to_string()),
                levels: parse_levels(&el, diagnostics, &owner),
            };
            table.abstracts.entry(def.id.clone()).or_insert(def);
        }

        for el in root.children_named("w:num") {
            let Some(num_id) = el.attr("w:numId") else {
                diagnostics.push(DiagnosticKind::MalformedNode, PART, "w:num without w:numId");
                continue;
            };
            let Some(abstract_num_id) = val_of(&el, "w:abstractNumId") else {
                diagnostics.push(
                    DiagnosticKind::MalformedNode,
                    PART,
                    format!("num {} without w:abstractNumId", num_id),
                );
                continue;
            };
            if !table.abstracts.contains_key(abstract_num_id) {
                diagnostics.push(
                    DiagnosticKind::UnresolvableReference,
                    PART,
                    format!("num {} references missing abstractNum {}", num_id, abstract_num_id),
                );
            }

            let mut overrides: [Option<LevelOverride>; LEVEL_COUNT] = Default::default();
            for ov in el.children_named("w:lvlOverride") {
                let Some(level) = int_attr(&ov, "w:ilvl")
                    .and_then(|l| usize::try_from(l).ok())
                    .filter(|l| *l < LEVEL_COUNT)
                else {
                    diagnostics.push(
                        DiagnosticKind::MalformedNode,
                        PART,
                        format!("num {}: w:lvlOverride without a valid w:ilvl", num_id),
                    );
                    continue;
                };
                let start_override = ov
                    .child("w:startOverride")
                    .and_then(|s| int_attr(&s, "w:val"))
                    .map(clamp_start);
                let owner = format!("num {} override", num_id);
                let mut replaced = parse_levels(&ov, diagnostics, &owner);
                // The override's own w:lvl normally repeats the ilvl; trust the
                // override position when it does not.
                let level_def = replaced.iter_mut().find_map(Option::take).map(|mut d| {
                    d.level = level as u8;
                    d
                });
                overrides[level] = Some(LevelOverride {
                    start_override,
                    level: level_def,
                });
            }

            let instance = NumberingInstance {
                num_id: num_id.to_string(),
                abstract_num_id: abstract_num_id.to_string(),
                overrides,
            };
            table.instances.entry(instance.num_id.clone()).or_insert(instance);
        }

        log::debug!(
            "Numbering table: {} abstract definitions, {} instances",
            table.abstracts.len(),
            table.instances.len()
        );
        table
    }

    /// Abstract definition behind `num_id`, following a `numStyleLink` to the
    /// definition carrying the matching `styleLink` when the first one has
    /// no levels of its own.
    pub fn abstract_for(&self, num_id: &str) -> Option<&AbstractNumbering> {
        let instance = self.instances.get(num_id)?;
        let abs = self.abstracts.get(&instance.abstract_num_id)?;
        if abs.has_levels() {
            return Some(abs);
        }
        let Some(link) = abs.num_style_link.as_deref() else {
            return Some(abs);
        };
        let linked = self
            .abstracts
            .values()
            .find(|a| a.id != abs.id && a.style_link.as_deref() == Some(link) && a.has_levels());
        match linked {
            Some(l) => Some(l),
            None => {
                log::debug!("numStyleLink {:?} of abstractNum {} not found", link, abs.id);
                Some(abs)
            }
        }
    }

    /// Resolve one level: a complete `w:lvl` override replaces the abstract
    /// level, a start override then replaces `start` only.
    pub fn effective_level(&self, num_id: &str, level: u8) -> Option<EffectiveLevel> {
        if num_id == "0" || level as usize >= LEVEL_COUNT {
            return None;
        }
        let instance = self.instances.get(num_id)?;
        let abs = self.abstract_for(num_id)?;
        let ov = instance.overrides[level as usize].as_ref();

        let (mut def, source) = match ov.and_then(|o| o.level.clone()) {
            Some(replaced) => (replaced, LevelSource::Override),
            None => (abs.levels[level as usize].clone()?, LevelSource::Abstract),
        };
        let start_override = ov.and_then(|o| o.start_override);
        if let Some(start) = start_override {
            def.start = start;
        }

        Some(EffectiveLevel {
            num_id: instance.num_id.clone(),
            abstract_num_id: abs.id.clone(),
            def,
            source,
            start_overridden: start_override.is_some(),
        })
    }

    /// All resolvable levels of one instance, shallowest first.
    pub fn effective_levels(&self, num_id: &str) -> Vec<EffectiveLevel> {
        (0..LEVEL_COUNT as u8)
            .filter_map(|l| self.effective_level(num_id, l))
            .collect()
    }

    /// Instance ids in numeric order (non-numeric ids sort last, by text).
    pub fn instance_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.instances.keys().map(String::as_str).collect();
        ids.sort_by_key(|id| (id.parse::<u64>().unwrap_or(u64::MAX), id.to_string()));
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty() && self.abstracts.is_empty()
    }
}
