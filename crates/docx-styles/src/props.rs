//! Run, paragraph and table formatting extracted from `w:rPr`, `w:pPr` and
//! `w:tblPr`, with one explicit merge function per property group.
//!
//! Merging always returns a new value; the child side wins wherever it sets
//! a property, the parent side fills whatever the child leaves unset.

use serde::Serialize;

use docx_core::model::{TabAlignment, TabLeader, TabStop};
use docx_core::units::{EighthPoints, Twips};
use docx_utils::xml::{int_attr, on_off, val_of, Element};

fn pick<T: Clone>(child: &Option<T>, parent: &Option<T>) -> Option<T> {
    child.clone().or_else(|| parent.clone())
}

// ---------------------------------------------------------------------------
// Shared value types
// ---------------------------------------------------------------------------

/// A color as written in the part. Theme colors are resolved against the
/// theme only when the stylesheet is generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorValue {
    Auto,
    /// Six uppercase hex digits, no `#`.
    Rgb(String),
    Theme {
        role: String,
        tint: Option<u8>,
        shade: Option<u8>,
        /// The literal `w:val` written next to the theme reference.
        fallback: Option<String>,
    },
}

impl ColorValue {
    /// Build from `w:val` plus the optional `w:themeColor`/`w:themeTint`/`w:themeShade`
    /// attribute names of the element (`w:color` and `w:shd` name them differently).
    fn from_attrs(el: &Element<'_>, val: &str, theme: &str, tint: &str, shade: &str) -> Option<Self> {
        let literal = el.attr(val).and_then(normalize_hex);
        if let Some(role) = el.attr(theme) {
            return Some(ColorValue::Theme {
                role: role.to_string(),
                tint: el.attr(tint).and_then(parse_hex_byte),
                shade: el.attr(shade).and_then(parse_hex_byte),
                fallback: literal,
            });
        }
        match el.attr(val) {
            Some("auto") => Some(ColorValue::Auto),
            Some(_) => literal.map(ColorValue::Rgb),
            None => None,
        }
    }
}

fn normalize_hex(raw: &str) -> Option<String> {
    let raw = raw.trim().trim_start_matches('#');
    if raw.len() == 6 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(raw.to_ascii_uppercase())
    } else {
        None
    }
}

fn parse_hex_byte(raw: &str) -> Option<u8> {
    u8::from_str_radix(raw.trim(), 16).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn from_word(val: &str) -> Option<Self> {
        match val {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "both" | "distribute" | "thaiDistribute" | "lowKashida" | "mediumKashida"
            | "highKashida" => Some(Alignment::Justify),
            _ => None,
        }
    }

    pub fn css(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

// ---------------------------------------------------------------------------
// Run formatting
// ---------------------------------------------------------------------------

/// `w:rFonts`: explicit families per script plus theme font references.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FontSet {
    pub ascii: Option<String>,
    pub h_ansi: Option<String>,
    pub east_asia: Option<String>,
    pub complex_script: Option<String>,
    pub ascii_theme: Option<String>,
    pub east_asia_theme: Option<String>,
    pub complex_script_theme: Option<String>,
}

impl FontSet {
    fn parse(el: &Element<'_>) -> Self {
        let owned = |q: &str| el.attr(q).map(|s| s.to_string());
        Self {
            ascii: owned("w:ascii"),
            h_ansi: owned("w:hAnsi"),
            east_asia: owned("w:eastAsia"),
            complex_script: owned("w:cs"),
            ascii_theme: owned("w:asciiTheme").or_else(|| owned("w:hAnsiTheme")),
            east_asia_theme: owned("w:eastAsiaTheme"),
            complex_script_theme: owned("w:cstheme"),
        }
    }

    /// Explicit fonts and theme references override per slot; an explicit
    /// font on the child also hides a theme reference inherited for that slot.
    pub fn merged(&self, child: &FontSet) -> FontSet {
        let slot = |c: &Option<String>, ct: &Option<String>, p: &Option<String>, pt: &Option<String>| {
            if c.is_some() || ct.is_some() {
                (c.clone(), ct.clone())
            } else {
                (p.clone(), pt.clone())
            }
        };
        let (ascii, ascii_theme) = slot(&child.ascii, &child.ascii_theme, &self.ascii, &self.ascii_theme);
        let (east_asia, east_asia_theme) = slot(
            &child.east_asia,
            &child.east_asia_theme,
            &self.east_asia,
            &self.east_asia_theme,
        );
        let (complex_script, complex_script_theme) = slot(
            &child.complex_script,
            &child.complex_script_theme,
            &self.complex_script,
            &self.complex_script_theme,
        );
        FontSet {
            ascii,
            h_ansi: pick(&child.h_ansi, &self.h_ansi),
            east_asia,
            complex_script,
            ascii_theme,
            east_asia_theme,
            complex_script_theme,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == FontSet::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Underline {
    None,
    Single,
    Double,
    Thick,
    Dotted,
    Dashed,
    Wave,
    Words,
}

impl Underline {
    pub fn from_word(val: &str) -> Self {
        match val {
            "none" => Underline::None,
            "double" => Underline::Double,
            "thick" => Underline::Thick,
            "dotted" | "dottedHeavy" => Underline::Dotted,
            "dash" | "dashedHeavy" | "dashLong" | "dashLongHeavy" | "dotDash" | "dotDotDash" => {
                Underline::Dashed
            }
            "wave" | "wavyHeavy" | "wavyDouble" => Underline::Wave,
            "words" => Underline::Words,
            _ => Underline::Single,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VertAlign {
    Baseline,
    Superscript,
    Subscript,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RunProps {
    pub fonts: FontSet,
    /// Font size, converted from half-points on parse.
    pub size: Option<Twips>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub strike: Option<bool>,
    pub caps: Option<bool>,
    pub small_caps: Option<bool>,
    pub hidden: Option<bool>,
    pub color: Option<ColorValue>,
    pub underline: Option<Underline>,
    pub highlight: Option<String>,
    pub vert_align: Option<VertAlign>,
}

impl RunProps {
    pub fn parse(rpr: &Element<'_>) -> Self {
        let mut props = RunProps {
            bold: on_off(rpr, "w:b"),
            italic: on_off(rpr, "w:i"),
            strike: on_off(rpr, "w:strike").or_else(|| on_off(rpr, "w:dstrike")),
            caps: on_off(rpr, "w:caps"),
            small_caps: on_off(rpr, "w:smallCaps"),
            hidden: on_off(rpr, "w:vanish"),
            ..Default::default()
        };

        if let Some(fonts) = rpr.child("w:rFonts") {
            props.fonts = FontSet::parse(&fonts);
        }
        if let Some(sz) = rpr.child("w:sz") {
            props.size = int_attr(&sz, "w:val")
                .filter(|v| *v > 0)
                .map(Twips::from_half_points);
        }
        if let Some(color) = rpr.child("w:color") {
            props.color = ColorValue::from_attrs(
                &color,
                "w:val",
                "w:themeColor",
                "w:themeTint",
                "w:themeShade",
            );
        }
        if let Some(u) = val_of(rpr, "w:u") {
            props.underline = Some(Underline::from_word(u));
        }
        if let Some(h) = val_of(rpr, "w:highlight") {
            props.highlight = (h != "none").then(|| h.to_string());
        }
        if let Some(v) = val_of(rpr, "w:vertAlign") {
            props.vert_align = match v {
                "superscript" => Some(VertAlign::Superscript),
                "subscript" => Some(VertAlign::Subscript),
                "baseline" => Some(VertAlign::Baseline),
                _ => None,
            };
        }
        props
    }

    pub fn merged(&self, child: &RunProps) -> RunProps {
        RunProps {
            fonts: self.fonts.merged(&child.fonts),
            size: pick(&child.size, &self.size),
            bold: pick(&child.bold, &self.bold),
            italic: pick(&child.italic, &self.italic),
            strike: pick(&child.strike, &self.strike),
            caps: pick(&child.caps, &self.caps),
            small_caps: pick(&child.small_caps, &self.small_caps),
            hidden: pick(&child.hidden, &self.hidden),
            color: pick(&child.color, &self.color),
            underline: pick(&child.underline, &self.underline),
            highlight: pick(&child.highlight, &self.highlight),
            vert_align: pick(&child.vert_align, &self.vert_align),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == RunProps::default()
    }
}

// ---------------------------------------------------------------------------
// Paragraph formatting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Indentation {
    pub left: Option<Twips>,
    pub right: Option<Twips>,
    pub first_line: Option<Twips>,
    pub hanging: Option<Twips>,
}

impl Indentation {
    pub fn parse(ind: &Element<'_>) -> Self {
        let twips = |a: &str, b: &str| int_attr(ind, a).or_else(|| int_attr(ind, b)).map(Twips);
        Self {
            left: twips("w:left", "w:start"),
            right: twips("w:right", "w:end"),
            first_line: int_attr(ind, "w:firstLine").map(Twips),
            hanging: int_attr(ind, "w:hanging").map(Twips),
        }
    }

    /// `firstLine` and `hanging` are one property: whichever the child sets
    /// replaces both of the parent's.
    pub fn merged(&self, child: &Indentation) -> Indentation {
        let (first_line, hanging) = if child.first_line.is_some() || child.hanging.is_some() {
            (child.first_line, child.hanging)
        } else {
            (self.first_line, self.hanging)
        };
        Indentation {
            left: child.left.or(self.left),
            right: child.right.or(self.right),
            first_line,
            hanging,
        }
    }

    /// Signed first-line offset: positive indents, negative hangs.
    pub fn text_indent(&self) -> Option<Twips> {
        match (self.hanging, self.first_line) {
            (Some(h), _) if !h.is_zero() => Some(-h),
            (_, Some(f)) => Some(f),
            (Some(h), None) => Some(-h),
            (None, None) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Indentation::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineRule {
    /// `line` is in 240ths of a single line.
    Auto,
    /// `line` is in twips, exactly.
    Exact,
    /// `line` is in twips, minimum.
    AtLeast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Spacing {
    pub before: Option<Twips>,
    pub after: Option<Twips>,
    pub line: Option<i64>,
    pub line_rule: Option<LineRule>,
}

impl Spacing {
    pub fn parse(el: &Element<'_>) -> Self {
        Self {
            before: int_attr(el, "w:before").map(Twips),
            after: int_attr(el, "w:after").map(Twips),
            line: int_attr(el, "w:line"),
            line_rule: el.attr("w:lineRule").map(|r| match r {
                "exact" => LineRule::Exact,
                "atLeast" => LineRule::AtLeast,
                _ => LineRule::Auto,
            }),
        }
    }

    pub fn merged(&self, child: &Spacing) -> Spacing {
        // line and lineRule travel together.
        let (line, line_rule) = if child.line.is_some() {
            (child.line, child.line_rule)
        } else {
            (self.line, self.line_rule)
        };
        Spacing {
            before: child.before.or(self.before),
            after: child.after.or(self.after),
            line,
            line_rule,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BorderSpec {
    /// `w:val` as written (`single`, `double`, `dotted`, `nil`, ...).
    pub style: String,
    pub size: Option<EighthPoints>,
    pub color: Option<ColorValue>,
    /// Distance from text, already in points.
    pub space: Option<i64>,
}

impl BorderSpec {
    pub fn parse(el: &Element<'_>) -> Option<Self> {
        let style = el.attr("w:val")?.to_string();
        Some(Self {
            style,
            size: int_attr(el, "w:sz").map(EighthPoints),
            color: ColorValue::from_attrs(el, "w:color", "w:themeColor", "w:themeTint", "w:themeShade"),
            space: int_attr(el, "w:space"),
        })
    }

    pub fn is_none(&self) -> bool {
        matches!(self.style.as_str(), "nil" | "none")
    }

    pub fn css_style(&self) -> &'static str {
        match self.style.as_str() {
            "nil" | "none" => "none",
            "double" | "triple" => "double",
            "dotted" => "dotted",
            "dashed" | "dashSmallGap" | "dotDash" | "dotDotDash" => "dashed",
            "inset" => "inset",
            "outset" => "outset",
            "threeDEmboss" => "ridge",
            "threeDEngrave" => "groove",
            _ => "solid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Borders {
    pub top: Option<BorderSpec>,
    pub bottom: Option<BorderSpec>,
    pub left: Option<BorderSpec>,
    pub right: Option<BorderSpec>,
    pub between: Option<BorderSpec>,
    pub inside_h: Option<BorderSpec>,
    pub inside_v: Option<BorderSpec>,
}

impl Borders {
    pub fn parse(el: &Element<'_>) -> Self {
        let side = |a: &str, b: &str| {
            el.child(a)
                .or_else(|| el.child(b))
                .and_then(|c| BorderSpec::parse(&c))
        };
        Self {
            top: side("w:top", "w:top"),
            bottom: side("w:bottom", "w:bottom"),
            left: side("w:left", "w:start"),
            right: side("w:right", "w:end"),
            between: side("w:between", "w:between"),
            inside_h: side("w:insideH", "w:insideH"),
            inside_v: side("w:insideV", "w:insideV"),
        }
    }

    pub fn merged(&self, child: &Borders) -> Borders {
        Borders {
            top: pick(&child.top, &self.top),
            bottom: pick(&child.bottom, &self.bottom),
            left: pick(&child.left, &self.left),
            right: pick(&child.right, &self.right),
            between: pick(&child.between, &self.between),
            inside_h: pick(&child.inside_h, &self.inside_h),
            inside_v: pick(&child.inside_v, &self.inside_v),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Borders::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shading {
    pub pattern: Option<String>,
    pub fill: Option<ColorValue>,
}

impl Shading {
    pub fn parse(el: &Element<'_>) -> Self {
        Self {
            pattern: el.attr("w:val").map(|s| s.to_string()),
            fill: ColorValue::from_attrs(el, "w:fill", "w:themeFill", "w:themeFillTint", "w:themeFillShade"),
        }
    }
}

/// `w:numPr` on a paragraph or style. Styles commonly set only `numId`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NumberingRef {
    pub num_id: Option<String>,
    pub level: Option<u8>,
}

impl NumberingRef {
    pub fn parse(num_pr: &Element<'_>) -> Self {
        Self {
            num_id: val_of(num_pr, "w:numId").map(|s| s.to_string()),
            level: num_pr
                .child("w:ilvl")
                .and_then(|l| int_attr(&l, "w:val"))
                .and_then(|l| u8::try_from(l).ok())
                .map(|l| l.min(8)),
        }
    }

    pub fn merged(&self, child: &NumberingRef) -> NumberingRef {
        NumberingRef {
            num_id: pick(&child.num_id, &self.num_id),
            level: child.level.or(self.level),
        }
    }
}

/// Parse `w:tabs`.
pub fn parse_tabs(tabs: &Element<'_>) -> Vec<TabStop> {
    tabs.children_named("w:tab")
        .iter()
        .filter_map(|tab| {
            let alignment = TabAlignment::from_word(tab.attr("w:val")?)?;
            let position = Twips(int_attr(tab, "w:pos")?);
            let leader = tab.attr("w:leader").map(TabLeader::from_word).unwrap_or_default();
            Some(TabStop {
                position,
                alignment,
                leader,
            })
        })
        .collect()
}

/// Inherited stops plus the child's: a child stop replaces any parent stop
/// at the same position, a `clear` stop removes it.
pub fn merge_tabs(parent: &[TabStop], child: &[TabStop]) -> Vec<TabStop> {
    let mut out: Vec<TabStop> = parent
        .iter()
        .filter(|t| t.alignment != TabAlignment::Clear)
        .copied()
        .collect();
    for tab in child {
        out.retain(|t| t.position != tab.position);
        if tab.alignment != TabAlignment::Clear {
            out.push(*tab);
        }
    }
    out.sort_by_key(|t| t.position);
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ParagraphProps {
    pub alignment: Option<Alignment>,
    pub indentation: Indentation,
    pub spacing: Spacing,
    pub borders: Borders,
    pub shading: Option<Shading>,
    pub tabs: Vec<TabStop>,
    pub numbering: Option<NumberingRef>,
    pub outline_level: Option<u8>,
    pub keep_next: Option<bool>,
    pub page_break_before: Option<bool>,
}

impl ParagraphProps {
    pub fn parse(ppr: &Element<'_>) -> Self {
        let mut props = ParagraphProps {
            alignment: val_of(ppr, "w:jc").and_then(Alignment::from_word),
            keep_next: on_off(ppr, "w:keepNext"),
            page_break_before: on_off(ppr, "w:pageBreakBefore"),
            ..Default::default()
        };
        if let Some(ind) = ppr.child("w:ind") {
            props.indentation = Indentation::parse(&ind);
        }
        if let Some(spacing) = ppr.child("w:spacing") {
            props.spacing = Spacing::parse(&spacing);
        }
        if let Some(bdr) = ppr.child("w:pBdr") {
            props.borders = Borders::parse(&bdr);
        }
        if let Some(shd) = ppr.child("w:shd") {
            props.shading = Some(Shading::parse(&shd));
        }
        if let Some(tabs) = ppr.child("w:tabs") {
            props.tabs = parse_tabs(&tabs);
        }
        if let Some(num_pr) = ppr.child("w:numPr") {
            props.numbering = Some(NumberingRef::parse(&num_pr));
        }
        if let Some(outline) = ppr.child("w:outlineLvl") {
            // 9 means "body text".
            props.outline_level = int_attr(&outline, "w:val")
                .and_then(|v| u8::try_from(v).ok())
                .filter(|v| *v < 9);
        }
        props
    }

    pub fn merged(&self, child: &ParagraphProps) -> ParagraphProps {
        let numbering = match (&self.numbering, &child.numbering) {
            (Some(p), Some(c)) => Some(p.merged(c)),
            (p, c) => pick(c, p),
        };
        ParagraphProps {
            alignment: child.alignment.or(self.alignment),
            indentation: self.indentation.merged(&child.indentation),
            spacing: self.spacing.merged(&child.spacing),
            borders: self.borders.merged(&child.borders),
            shading: pick(&child.shading, &self.shading),
            tabs: merge_tabs(&self.tabs, &child.tabs),
            numbering,
            outline_level: child.outline_level.or(self.outline_level),
            keep_next: child.keep_next.or(self.keep_next),
            page_break_before: child.page_break_before.or(self.page_break_before),
        }
    }
}

// ---------------------------------------------------------------------------
// Table formatting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TableProps {
    pub borders: Borders,
    pub alignment: Option<Alignment>,
    pub shading: Option<Shading>,
}

impl TableProps {
    pub fn parse(tbl_pr: &Element<'_>) -> Self {
        Self {
            borders: tbl_pr
                .child("w:tblBorders")
                .map(|b| Borders::parse(&b))
                .unwrap_or_default(),
            alignment: val_of(tbl_pr, "w:jc").and_then(Alignment::from_word),
            shading: tbl_pr.child("w:shd").map(|s| Shading::parse(&s)),
        }
    }

    pub fn merged(&self, child: &TableProps) -> TableProps {
        TableProps {
            borders: self.borders.merged(&child.borders),
            alignment: child.alignment.or(self.alignment),
            shading: pick(&child.shading, &self.shading),
        }
    }
}
