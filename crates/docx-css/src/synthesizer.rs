//! Stylesheet generation from resolved styles and numbering.
//!
//! Output is deterministic: styles are visited in id order per kind, numbering
//! instances in numeric id order, levels shallowest first.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;

use serde::Serialize;

use docx_core::error::Result;
use docx_core::naming;
use docx_core::options::ConversionOptions;
use docx_core::units::{format_ratio, Points, Twips};
use docx_styles::level_text::{self, LevelText};
use docx_styles::numbering::{EffectiveLevel, LevelSuffix, NumberFormat, NumberingTable};
use docx_styles::props::{
    BorderSpec, Borders, LineRule, ParagraphProps, RunProps, Shading, TableProps, Underline, VertAlign,
};
use docx_styles::settings::DocumentSettings;
use docx_styles::styles::{EffectiveStyle, StyleKind, StyleTable};
use docx_styles::theme::ThemeInfo;

use crate::baseline::BASELINE_CSS;

/// Style id → generated class name, per style kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassNameMap {
    pub paragraph: BTreeMap<String, String>,
    pub character: BTreeMap<String, String>,
    pub table: BTreeMap<String, String>,
}

impl ClassNameMap {
    pub fn get(&self, kind: StyleKind, id: &str) -> Option<&str> {
        let map = match kind {
            StyleKind::Paragraph => &self.paragraph,
            StyleKind::Character => &self.character,
            StyleKind::Table => &self.table,
            StyleKind::Numbering => return None,
        };
        map.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paragraph.len() + self.character.len() + self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assign [`naming::style_class`] names, suffixing `-2`, `-3`, ... when
    /// two ids slug to the same name.
    fn build(styles: &StyleTable, prefix: &str) -> Self {
        let mut used: HashSet<String> = HashSet::new();
        let mut assign = |kind: StyleKind, infix: &str| -> BTreeMap<String, String> {
            styles
                .map(kind)
                .keys()
                .map(|id| {
                    let base = naming::style_class(prefix, infix, id);
                    let mut name = base.clone();
                    let mut n = 2;
                    while used.contains(&name) {
                        name = format!("{}-{}", base, n);
                        n += 1;
                    }
                    used.insert(name.clone());
                    (id.clone(), name)
                })
                .collect()
        };
        let paragraph = assign(StyleKind::Paragraph, "");
        let character = assign(StyleKind::Character, "char");
        let table = assign(StyleKind::Table, "table");
        Self {
            paragraph,
            character,
            table,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stylesheet {
    pub css: String,
    pub class_names: ClassNameMap,
    /// Synthesis failed and `css` is the baseline stylesheet.
    pub is_fallback: bool,
}

impl Stylesheet {
    pub fn baseline() -> Self {
        Self {
            css: BASELINE_CSS.to_string(),
            class_names: ClassNameMap::default(),
            is_fallback: true,
        }
    }
}

#[derive(Clone, Copy)]
struct SynthesisInput<'a> {
    styles: &'a StyleTable,
    numbering: &'a NumberingTable,
    theme: &'a ThemeInfo,
    settings: &'a DocumentSettings,
}

/// Build the stylesheet for one document. Never fails: an internal error
/// yields the baseline stylesheet with `is_fallback` set.
pub fn synthesize(
    styles: &StyleTable,
    numbering: &NumberingTable,
    theme: &ThemeInfo,
    settings: &DocumentSettings,
    options: &ConversionOptions,
) -> Stylesheet {
    let input = SynthesisInput {
        styles,
        numbering,
        theme,
        settings,
    };
    let class_names = ClassNameMap::build(input.styles, &options.class_prefix);
    let writer = CssWriter {
        input,
        options,
        class_names: &class_names,
    };
    let css = match writer.write() {
        Ok(css) => css,
        Err(e) => {
            log::warn!("Stylesheet synthesis failed, using baseline: {}", e);
            return Stylesheet::baseline();
        }
    };
    let css = if options.minify_css {
        minify_css(&css)
    } else {
        css
    };
    log::debug!(
        "Synthesized stylesheet: {} classes, {} bytes",
        class_names.len(),
        css.len()
    );
    Stylesheet {
        css,
        class_names,
        is_fallback: false,
    }
}

/// Minify through lightningcss, keeping the input when it does not parse.
pub fn minify_css(css: &str) -> String {
    use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};

    match StyleSheet::parse(css, ParserOptions::default()) {
        Ok(mut stylesheet) => {
            if let Err(e) = stylesheet.minify(MinifyOptions::default()) {
                log::warn!("CSS minification warning: {}", e);
            }
            let printer = PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            };
            match stylesheet.to_css(printer) {
                Ok(result) => {
                    log::debug!("Minified stylesheet ({} → {} bytes)", css.len(), result.code.len());
                    result.code
                }
                Err(e) => {
                    log::warn!("CSS print failed: {}, keeping original", e);
                    css.to_string()
                }
            }
        }
        Err(e) => {
            log::warn!("CSS parse failed: {}, keeping original", e);
            css.to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

type Decls = Vec<(&'static str, String)>;

fn pt(twips: Twips) -> String {
    twips.to_points().to_string()
}

fn hex(color: &str) -> String {
    format!("#{}", color)
}

/// Quote a CSS string, escaping quotes, backslashes and non-ASCII
/// characters (`\2022 `).
pub fn css_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let _ = write!(out, "\\{:x} ", c as u32);
            }
        }
    }
    out.push('"');
    out
}

fn font_family(name: &str) -> String {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') && !name.starts_with(|c: char| c.is_ascii_digit()) {
        name.to_string()
    } else {
        css_string(name)
    }
}

fn highlight_color(name: &str) -> Option<&'static str> {
    Some(match name {
        "black" => "#000000",
        "blue" => "#0000FF",
        "cyan" => "#00FFFF",
        "green" => "#00FF00",
        "magenta" => "#FF00FF",
        "red" => "#FF0000",
        "yellow" => "#FFFF00",
        "white" => "#FFFFFF",
        "darkBlue" => "#000080",
        "darkCyan" => "#008080",
        "darkGreen" => "#008000",
        "darkMagenta" => "#800080",
        "darkRed" => "#800000",
        "darkYellow" => "#808000",
        "darkGray" => "#808080",
        "lightGray" => "#C0C0C0",
        _ => return None,
    })
}

fn run_decls(run: &RunProps, theme: &ThemeInfo) -> Decls {
    let mut decls = Decls::new();

    let mut families: Vec<String> = Vec::new();
    let explicit_or_theme = |explicit: &Option<String>, theme_ref: &Option<String>| {
        explicit
            .clone()
            .or_else(|| theme_ref.as_deref().and_then(|r| theme.resolve_font(r)).map(str::to_string))
    };
    let fonts = &run.fonts;
    for family in [
        explicit_or_theme(&fonts.ascii, &fonts.ascii_theme).or_else(|| fonts.h_ansi.clone()),
        explicit_or_theme(&fonts.east_asia, &fonts.east_asia_theme),
        explicit_or_theme(&fonts.complex_script, &fonts.complex_script_theme),
    ]
    .into_iter()
    .flatten()
    {
        if !families.contains(&family) {
            families.push(family);
        }
    }
    if !families.is_empty() {
        let list: Vec<String> = families.iter().map(|f| font_family(f)).collect();
        decls.push(("font-family", list.join(", ")));
    }

    if let Some(size) = run.size {
        decls.push(("font-size", pt(size)));
    }
    if let Some(bold) = run.bold {
        decls.push(("font-weight", if bold { "bold" } else { "normal" }.to_string()));
    }
    if let Some(italic) = run.italic {
        decls.push(("font-style", if italic { "italic" } else { "normal" }.to_string()));
    }

    let mut lines = Vec::new();
    if matches!(run.underline, Some(u) if u != Underline::None) {
        lines.push("underline");
    }
    if run.strike == Some(true) {
        lines.push("line-through");
    }
    if !lines.is_empty() {
        decls.push(("text-decoration-line", lines.join(" ")));
        let style = match run.underline {
            Some(Underline::Double) => Some("double"),
            Some(Underline::Dotted) => Some("dotted"),
            Some(Underline::Dashed) => Some("dashed"),
            Some(Underline::Wave) => Some("wavy"),
            _ => None,
        };
        if let Some(style) = style {
            decls.push(("text-decoration-style", style.to_string()));
        }
    } else if run.underline == Some(Underline::None) || run.strike == Some(false) {
        decls.push(("text-decoration-line", "none".to_string()));
    }

    if let Some(caps) = run.caps {
        decls.push(("text-transform", if caps { "uppercase" } else { "none" }.to_string()));
    }
    if let Some(small_caps) = run.small_caps {
        decls.push(("font-variant", if small_caps { "small-caps" } else { "normal" }.to_string()));
    }
    if run.hidden == Some(true) {
        decls.push(("display", "none".to_string()));
    }
    if let Some(color) = run.color.as_ref().and_then(|c| theme.resolve_color(c)) {
        decls.push(("color", hex(&color)));
    }
    if let Some(bg) = run.highlight.as_deref().and_then(highlight_color) {
        decls.push(("background-color", bg.to_string()));
    }
    match run.vert_align {
        Some(VertAlign::Superscript) => decls.push(("vertical-align", "super".to_string())),
        Some(VertAlign::Subscript) => decls.push(("vertical-align", "sub".to_string())),
        Some(VertAlign::Baseline) => decls.push(("vertical-align", "baseline".to_string())),
        None => {}
    }
    decls
}

fn border_value(spec: &BorderSpec, theme: &ThemeInfo) -> String {
    if spec.is_none() {
        return "none".to_string();
    }
    let width = spec
        .size
        .map(|s| s.to_points())
        .unwrap_or_else(|| Points::from_millis(500));
    let color = spec
        .color
        .as_ref()
        .and_then(|c| theme.resolve_color(c))
        .map(|c| hex(&c))
        .unwrap_or_else(|| "currentColor".to_string());
    format!("{} {} {}", width, spec.css_style(), color)
}

fn border_decls(borders: &Borders, theme: &ThemeInfo, decls: &mut Decls) {
    let sides = [
        ("border-top", "padding-top", &borders.top),
        ("border-right", "padding-right", &borders.right),
        ("border-bottom", "padding-bottom", &borders.bottom),
        ("border-left", "padding-left", &borders.left),
    ];
    for (border, padding, spec) in sides {
        let Some(spec) = spec else {
            continue;
        };
        decls.push((border, border_value(spec, theme)));
        if let Some(space) = spec.space.filter(|s| *s > 0 && !spec.is_none()) {
            decls.push((padding, Points::from_whole(space).to_string()));
        }
    }
}

fn shading_decls(shading: &Option<Shading>, theme: &ThemeInfo, decls: &mut Decls) {
    if let Some(fill) = shading
        .as_ref()
        .and_then(|s| s.fill.as_ref())
        .and_then(|f| theme.resolve_color(f))
    {
        decls.push(("background-color", hex(&fill)));
    }
}

fn paragraph_decls(para: &ParagraphProps, theme: &ThemeInfo) -> Decls {
    let mut decls = Decls::new();
    if let Some(align) = para.alignment {
        decls.push(("text-align", align.css().to_string()));
    }
    let spacing = &para.spacing;
    if let Some(before) = spacing.before {
        decls.push(("margin-top", pt(before)));
    }
    if let Some(after) = spacing.after {
        decls.push(("margin-bottom", pt(after)));
    }
    if let Some(line) = spacing.line {
        let value = match spacing.line_rule.unwrap_or(LineRule::Auto) {
            LineRule::Auto => format_ratio(line, 240),
            LineRule::Exact | LineRule::AtLeast => Some(pt(Twips(line))),
        };
        if let Some(value) = value {
            decls.push(("line-height", value));
        }
    }
    let ind = &para.indentation;
    if let Some(left) = ind.left {
        decls.push(("margin-left", pt(left)));
    }
    if let Some(right) = ind.right {
        decls.push(("margin-right", pt(right)));
    }
    if let Some(indent) = ind.text_indent() {
        decls.push(("text-indent", pt(indent)));
    }
    border_decls(&para.borders, theme, &mut decls);
    shading_decls(&para.shading, theme, &mut decls);
    if para.keep_next == Some(true) {
        decls.push(("break-after", "avoid".to_string()));
    }
    if para.page_break_before == Some(true) {
        decls.push(("break-before", "page".to_string()));
    }
    decls
}

fn table_decls(table: &TableProps, theme: &ThemeInfo) -> Decls {
    let mut decls = Decls::new();
    if !table.borders.is_empty() {
        decls.push(("border-collapse", "collapse".to_string()));
    }
    border_decls(&table.borders, theme, &mut decls);
    shading_decls(&table.shading, theme, &mut decls);
    match table.alignment.map(|a| a.css()) {
        Some("center") => {
            decls.push(("margin-left", "auto".to_string()));
            decls.push(("margin-right", "auto".to_string()));
        }
        Some("right") => decls.push(("margin-left", "auto".to_string())),
        _ => {}
    }
    decls
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

struct CssWriter<'a> {
    input: SynthesisInput<'a>,
    options: &'a ConversionOptions,
    class_names: &'a ClassNameMap,
}

impl CssWriter<'_> {
    fn write(&self) -> Result<String> {
        let mut css = String::new();
        self.write_body(&mut css)?;
        self.write_styles(&mut css)?;
        self.write_numbering(&mut css)?;
        self.write_toc(&mut css)?;
        Ok(css)
    }

    fn rule(&self, css: &mut String, selector: &str, decls: &Decls) -> Result<()> {
        if decls.is_empty() {
            return Ok(());
        }
        writeln!(css, "{} {{", selector)?;
        for (prop, value) in decls {
            writeln!(css, "  {}: {};", prop, value)?;
        }
        writeln!(css, "}}")?;
        Ok(())
    }

    fn write_body(&self, css: &mut String) -> Result<()> {
        let SynthesisInput {
            styles,
            theme,
            settings,
            ..
        } = self.input;
        let defaults = &styles.doc_defaults;
        let mut decls = run_decls(&defaults.run, theme);
        if !decls.iter().any(|(p, _)| *p == "font-family") {
            if let Some(minor) = theme.minor.latin.as_deref() {
                decls.insert(0, ("font-family", font_family(minor)));
            }
        }
        decls.extend(paragraph_decls(&defaults.paragraph, theme));
        decls.push(("tab-size", settings.tab_size_css()));
        if settings.auto_hyphenation {
            decls.push(("hyphens", "auto".to_string()));
        }
        self.rule(css, "body", &decls)
    }

    fn effective(&self, kind: StyleKind, id: &str) -> Option<EffectiveStyle> {
        let styles = self.input.styles;
        if self.options.resolve_based_on {
            styles.resolve_effective_kind(kind, id, self.options.max_based_on_depth)
        } else {
            styles.direct_kind(kind, id)
        }
    }

    fn write_styles(&self, css: &mut String) -> Result<()> {
        let theme = self.input.theme;
        for (id, class) in &self.class_names.paragraph {
            let Some(style) = self.effective(StyleKind::Paragraph, id) else {
                continue;
            };
            let mut decls = paragraph_decls(&style.paragraph, theme);
            decls.extend(run_decls(&style.run, theme));
            self.rule(css, &format!(".{}", class), &decls)?;
        }
        for (id, class) in &self.class_names.character {
            let Some(style) = self.effective(StyleKind::Character, id) else {
                continue;
            };
            self.rule(css, &format!(".{}", class), &run_decls(&style.run, theme))?;
        }
        for (id, class) in &self.class_names.table {
            let Some(style) = self.effective(StyleKind::Table, id) else {
                continue;
            };
            let selector = format!(".{}", class);
            self.rule(css, &selector, &table_decls(&style.table, theme))?;
            let borders = &style.table.borders;
            let mut cell = Decls::new();
            if let Some(h) = &borders.inside_h {
                cell.push(("border-top", border_value(h, theme)));
                cell.push(("border-bottom", border_value(h, theme)));
            }
            if let Some(v) = &borders.inside_v {
                cell.push(("border-left", border_value(v, theme)));
                cell.push(("border-right", border_value(v, theme)));
            }
            self.rule(css, &format!("{} td, {} th", selector, selector), &cell)?;
        }
        Ok(())
    }

    fn write_numbering(&self, css: &mut String) -> Result<()> {
        let numbering = self.input.numbering;
        let prefix = self.options.class_prefix.as_str();
        for num_id in numbering.instance_ids() {
            let levels = numbering.effective_levels(num_id);
            if levels.is_empty() {
                continue;
            }

            let resets: Vec<String> = levels
                .iter()
                .map(|l| {
                    format!(
                        "{} {}",
                        naming::counter_name(prefix, num_id, l.level()),
                        l.start() as i64 - 1
                    )
                })
                .collect();
            self.rule(
                css,
                &format!(".{}", naming::list_class(prefix, num_id)),
                &vec![
                    ("counter-reset", resets.join(" ")),
                    ("list-style", "none".to_string()),
                    ("padding-left", "0".to_string()),
                ],
            )?;

            for level in &levels {
                self.write_level(css, num_id, level, &levels)?;
            }
        }
        Ok(())
    }

    fn write_level(
        &self,
        css: &mut String,
        num_id: &str,
        level: &EffectiveLevel,
        all: &[EffectiveLevel],
    ) -> Result<()> {
        let prefix = self.options.class_prefix.as_str();
        let theme = self.input.theme;
        let def = &level.def;
        let lvl = level.level();
        let item = format!(".{}", naming::item_class(prefix, num_id, lvl));

        let mut decls = Decls::new();
        if def.format != NumberFormat::Bullet {
            decls.push(("counter-increment", naming::counter_name(prefix, num_id, lvl)));
        }
        // Counters of deeper levels that restart when this one advances.
        let dependents: Vec<String> = all
            .iter()
            .filter(|d| d.level() > lvl && d.def.restarts_after(lvl))
            .map(|d| {
                format!(
                    "{} {}",
                    naming::counter_name(prefix, num_id, d.level()),
                    d.start() as i64 - 1
                )
            })
            .collect();
        if !dependents.is_empty() {
            decls.push(("counter-reset", dependents.join(" ")));
        }
        decls.push(("list-style", "none".to_string()));
        if let Some(left) = def.indentation.left {
            decls.push(("margin-left", pt(left)));
        }
        if let Some(indent) = def.indentation.text_indent() {
            decls.push(("text-indent", pt(indent)));
        }
        self.rule(css, &item, &decls)?;

        let mut marker = vec![("content", self.marker_content(num_id, level, all))];
        marker.extend(
            run_decls(&def.marker_run, theme)
                .into_iter()
                .filter(|(p, _)| *p != "font-family" || def.format != NumberFormat::Bullet),
        );
        match def.suffix {
            LevelSuffix::Tab => {
                marker.push(("display", "inline-block".to_string()));
                let hanging = def.indentation.hanging.filter(|h| !h.is_zero());
                if let Some(h) = hanging {
                    marker.push(("min-width", pt(h)));
                }
            }
            LevelSuffix::Space | LevelSuffix::Nothing => {}
        }
        if let Some(align) = def.alignment {
            marker.push(("text-align", align.css().to_string()));
        }
        self.rule(css, &format!("{}::before", item), &marker)
    }

    fn marker_content(&self, num_id: &str, level: &EffectiveLevel, all: &[EffectiveLevel]) -> String {
        let prefix = self.options.class_prefix.as_str();
        let def = &level.def;
        let text: LevelText = def.level_text();
        let suffix = match def.suffix {
            LevelSuffix::Space => " ",
            _ => "",
        };

        if def.format == NumberFormat::Bullet || text.is_literal() {
            let literal = level_text::display_literal(text.literal.as_deref().unwrap_or_default());
            return css_string(&format!("{}{}", literal, suffix));
        }

        let mut parts: Vec<String> = Vec::new();
        for token in &text.tokens {
            if !token.literal_before.is_empty() {
                parts.push(css_string(&token.literal_before));
            }
            let format = all
                .iter()
                .find(|l| l.level() == token.level_ref)
                .map(|l| l.def.format)
                .unwrap_or(NumberFormat::Decimal);
            let style = if def.is_legal && format != NumberFormat::None {
                NumberFormat::Decimal.css_list_style()
            } else {
                format.css_list_style()
            };
            parts.push(format!(
                "counter({}, {})",
                naming::counter_name(prefix, num_id, token.level_ref),
                style
            ));
            let tail = format!("{}{}", token.separator, token.literal_after);
            if !tail.is_empty() {
                parts.push(css_string(&tail));
            }
        }
        if !suffix.is_empty() {
            parts.push(css_string(suffix));
        }
        parts.join(" ")
    }

    fn write_toc(&self, css: &mut String) -> Result<()> {
        let prefix = self.options.class_prefix.as_str();
        let styles = self.input.styles;
        for level in 1..=9u8 {
            // Indent from the TOCn style when the document defines one.
            let indent = styles
                .paragraph
                .keys()
                .find(|id| id.eq_ignore_ascii_case(&format!("TOC{}", level)))
                .and_then(|id| self.effective(StyleKind::Paragraph, id))
                .and_then(|s| s.paragraph.indentation.left)
                .unwrap_or(Twips(220 * (level as i64 - 1)));
            self.rule(
                css,
                &format!(".{}", naming::toc_class(prefix, level)),
                &vec![
                    ("display", "flex".to_string()),
                    ("margin-left", pt(indent)),
                ],
            )?;
        }
        Ok(())
    }
}
