//! Pipeline orchestrator. Runs every stage for one document and collects the
//! diagnostics raised along the way.

use log::info;
use serde::Serialize;

use docx_core::error::{DiagnosticKind, Diagnostic, Diagnostics, DocxError, Result};
use docx_core::model::{ParagraphRecord, StructureModel};
use docx_core::options::ConversionOptions;
use docx_css::{synthesize, Stylesheet};
use docx_structure::body::read_paragraphs;
use docx_structure::{ReconstructedDocument, Reconstructor, StructureAnalyzer};
use docx_styles::{DocumentSettings, NumberingTable, StyleKind, StyleTable, ThemeInfo};
use docx_utils::xml::{Namespaces, XmlDocument};

use crate::parts::{DocumentParts, PartKind};

/// Progress reporter callback type.
pub type ProgressReporter = Box<dyn Fn(f64, &str) + Send + Sync>;

/// Everything produced for one document.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    pub styles: StyleTable,
    pub numbering: NumberingTable,
    pub theme: ThemeInfo,
    pub settings: DocumentSettings,
    pub stylesheet: Stylesheet,
    /// The paragraph stream after style inheritance was applied.
    pub paragraphs: Vec<ParagraphRecord>,
    pub structure: StructureModel,
    pub document: ReconstructedDocument,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Serialize)]
struct StructureExport<'a> {
    structure: &'a StructureModel,
    document: &'a ReconstructedDocument,
}

impl ConversionOutput {
    /// Structure model and reconstructed tree as pretty-printed JSON.
    pub fn structure_json(&self) -> Result<String> {
        let export = StructureExport {
            structure: &self.structure,
            document: &self.document,
        };
        serde_json::to_string_pretty(&export)
            .map_err(|e| DocxError::Other(format!("Structure serialization failed: {}", e)))
    }

    pub fn css(&self) -> &str {
        &self.stylesheet.css
    }

    pub fn diagnostic_count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }
}

/// Runs the conversion stages with a fixed set of options.
pub struct Pipeline {
    options: ConversionOptions,
    namespaces: Namespaces,
    progress_reporter: Option<ProgressReporter>,
}

impl Pipeline {
    pub fn new(options: ConversionOptions) -> Self {
        let namespaces = Namespaces::ooxml().extended(&options.namespace_overrides);
        Self {
            options,
            namespaces,
            progress_reporter: None,
        }
    }

    /// Set a progress reporter callback.
    pub fn set_progress_reporter(&mut self, reporter: ProgressReporter) {
        self.progress_reporter = Some(reporter);
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert one document. Fails only when `parts` holds nothing at all;
    /// every other problem is reported in [`ConversionOutput::diagnostics`].
    pub fn run(&self, parts: &DocumentParts) -> Result<ConversionOutput> {
        if parts.is_empty() {
            return Err(DocxError::NoParts);
        }
        let mut diagnostics = Diagnostics::new();

        // Stage 1: definitions
        self.report_progress(0.0, "Parsing style definitions...");
        let styles = self
            .load(parts, PartKind::Styles, &mut diagnostics, StyleTable::from_xml)
            .unwrap_or_default();
        let numbering = self
            .load(parts, PartKind::Numbering, &mut diagnostics, NumberingTable::from_xml)
            .unwrap_or_default();
        let theme = self
            .load(parts, PartKind::Theme, &mut diagnostics, ThemeInfo::from_xml)
            .unwrap_or_default();
        let settings = self
            .load(parts, PartKind::Settings, &mut diagnostics, DocumentSettings::from_xml)
            .unwrap_or_default();
        info!(
            "Parsed {} styles, {} numbering instances",
            styles.len(),
            numbering.instances.len()
        );
        self.report_progress(0.30, "Definitions parsed");

        // Stage 2: paragraph stream
        let mut paragraphs = match &parts.paragraphs {
            Some(records) => records.clone(),
            None => self
                .load(parts, PartKind::Document, &mut diagnostics, read_paragraphs)
                .unwrap_or_default(),
        };
        inherit_from_styles(&mut paragraphs, &styles, &numbering, &self.options);
        self.report_progress(0.45, &format!("{} paragraphs", paragraphs.len()));

        // Stage 3: analysis
        info!("Analyzing structure...");
        let analyzer = StructureAnalyzer::new(&self.options)
            .with_normal_style(styles.default_paragraph.clone());
        let structure = analyzer.analyze(&paragraphs);
        report_references(&paragraphs, &numbering, &mut diagnostics);
        info!(
            "Structure: toc={} ({} entries), {} lists, {} special patterns",
            structure.has_toc,
            structure.toc_entries.len(),
            structure.lists.len(),
            structure.special_patterns.len()
        );
        self.report_progress(0.60, "Structure analyzed");

        // Stage 4: tree
        let document = Reconstructor::new(&numbering, &self.options).build(&paragraphs, &structure);
        self.report_progress(0.75, "Structure rebuilt");

        // Stage 5: stylesheet
        info!("Synthesizing stylesheet...");
        let stylesheet = synthesize(&styles, &numbering, &theme, &settings, &self.options);
        if stylesheet.is_fallback {
            log::warn!("Using baseline stylesheet");
        }
        self.report_progress(1.0, "Conversion complete");

        Ok(ConversionOutput {
            styles,
            numbering,
            theme,
            settings,
            stylesheet,
            paragraphs,
            structure,
            document,
            diagnostics: diagnostics.into_vec(),
        })
    }

    /// Parse one part. Absent or unparseable parts are recorded and yield
    /// `None` so the caller substitutes defaults.
    fn load<T>(
        &self,
        parts: &DocumentParts,
        kind: PartKind,
        diagnostics: &mut Diagnostics,
        build: impl FnOnce(&XmlDocument, &mut Diagnostics) -> T,
    ) -> Option<T> {
        let Some(xml) = parts.get(kind) else {
            diagnostics.push(DiagnosticKind::MissingPart, kind.name(), "part not supplied");
            return None;
        };
        match XmlDocument::parse(xml, &self.namespaces) {
            Ok(doc) => Some(build(&doc, diagnostics)),
            Err(e) => {
                diagnostics.push(DiagnosticKind::MissingPart, kind.name(), format!("unparseable: {}", e));
                None
            }
        }
    }

    fn report_progress(&self, fraction: f64, message: &str) {
        if let Some(ref reporter) = self.progress_reporter {
            reporter(fraction, message);
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(ConversionOptions::default())
    }
}

/// Apply paragraph-style inheritance the analyzer relies on: records without
/// direct numbering take their style's, records without tab stops take
/// their style's.
pub fn inherit_from_styles(
    paragraphs: &mut [ParagraphRecord],
    styles: &StyleTable,
    numbering: &NumberingTable,
    options: &ConversionOptions,
) {
    for record in paragraphs.iter_mut() {
        let Some(style_id) = record.style_id.as_deref() else {
            continue;
        };
        if record.num_id.is_some() && !record.tabs.is_empty() {
            continue;
        }
        let effective = if options.resolve_based_on {
            styles.resolve_effective_kind(
                StyleKind::Paragraph,
                style_id,
                options.max_based_on_depth,
            )
        } else {
            styles.direct_kind(StyleKind::Paragraph, style_id)
        };
        let Some(effective) = effective else {
            continue;
        };

        if record.num_id.is_none() {
            if let Some(num_id) = effective.paragraph.numbering.as_ref().and_then(|n| n.num_id.clone()) {
                let level = effective
                    .paragraph
                    .numbering
                    .as_ref()
                    .and_then(|n| n.level)
                    .or_else(|| level_linked_to_style(numbering, &num_id, style_id))
                    .unwrap_or(0);
                record.num_id = Some(num_id);
                record.level = Some(level);
            }
        }
        if record.tabs.is_empty() {
            record.tabs = effective.paragraph.tabs;
        }
    }
}

/// The level of `num_id` whose `w:pStyle` names `style_id`.
fn level_linked_to_style(numbering: &NumberingTable, num_id: &str, style_id: &str) -> Option<u8> {
    numbering
        .effective_levels(num_id)
        .into_iter()
        .find(|l| l.def.paragraph_style.as_deref() == Some(style_id))
        .map(|l| l.level())
}

/// One diagnostic per numbering reference that resolves to nothing.
fn report_references(paragraphs: &[ParagraphRecord], numbering: &NumberingTable, diagnostics: &mut Diagnostics) {
    let mut seen = std::collections::BTreeSet::new();
    for record in paragraphs {
        let Some((num_id, level)) = record.numbering() else {
            continue;
        };
        if numbering.effective_level(num_id, level).is_none() && seen.insert((num_id.to_string(), level)) {
            diagnostics.push(
                DiagnosticKind::UnresolvableReference,
                PartKind::Document.name(),
                format!("paragraph {} references numId {} level {}", record.index, num_id, level),
            );
        }
    }
}

/// Builder for a [`Pipeline`].
pub struct PipelineBuilder {
    options: ConversionOptions,
    progress_reporter: Option<ProgressReporter>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            options: ConversionOptions::default(),
            progress_reporter: None,
        }
    }

    pub fn options(mut self, options: ConversionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn progress_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        self.options.validate()?;
        let mut pipeline = Pipeline::new(self.options);
        if let Some(reporter) = self.progress_reporter {
            pipeline.set_progress_reporter(reporter);
        }
        Ok(pipeline)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use docx_core::model::PatternKind;
    use docx_structure::reconstruct::{DocNode, ListEntry};
    use std::sync::{Arc, Mutex};

    const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    pub(crate) fn styles_xml() -> String {
        format!(
            r#"<w:styles xmlns:w="{W}">
  <w:docDefaults><w:rPrDefault><w:rPr><w:sz w:val="24"/></w:rPr></w:rPrDefault></w:docDefaults>
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
  <w:style w:type="paragraph" w:styleId="ListBullet"><w:basedOn w:val="Normal"/>
    <w:pPr><w:numPr><w:numId w:val="2"/></w:numPr></w:pPr></w:style>
  <w:style w:type="paragraph" w:styleId="TOC1"><w:basedOn w:val="Normal"/>
    <w:pPr><w:tabs><w:tab w:val="right" w:leader="dot" w:pos="9350"/></w:tabs></w:pPr></w:style>
</w:styles>"#
        )
    }

    pub(crate) fn numbering_xml() -> String {
        format!(
            r#"<w:numbering xmlns:w="{W}">
  <w:abstractNum w:abstractNumId="0">
    <w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/></w:lvl>
    <w:lvl w:ilvl="1"><w:start w:val="1"/><w:numFmt w:val="lowerLetter"/><w:lvlText w:val="%2)"/></w:lvl>
  </w:abstractNum>
  <w:abstractNum w:abstractNumId="1">
    <w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/><w:lvlText w:val="&#xF0B7;"/><w:pStyle w:val="ListBullet"/></w:lvl>
  </w:abstractNum>
  <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
  <w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>
</w:numbering>"#
        )
    }

    fn p(style: Option<&str>, num: Option<(&str, u8)>, text: &str) -> String {
        let mut ppr = String::new();
        if let Some(s) = style {
            ppr.push_str(&format!(r#"<w:pStyle w:val="{}"/>"#, s));
        }
        if let Some((id, lvl)) = num {
            ppr.push_str(&format!(r#"<w:numPr><w:ilvl w:val="{}"/><w:numId w:val="{}"/></w:numPr>"#, lvl, id));
        }
        format!(
            r#"<w:p><w:pPr>{}</w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            ppr, text
        )
    }

    pub(crate) fn document_xml() -> String {
        let body = [
            r#"<w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText> TOC \o "1-3" </w:instrText></w:r><w:r><w:fldChar w:fldCharType="separate"/></w:r><w:r><w:t>Contents....12</w:t></w:r></w:p>"#.to_string(),
            r#"<w:p><w:r><w:fldChar w:fldCharType="end"/></w:r></w:p>"#.to_string(),
            p(None, None, "Introduction"),
            p(None, Some(("1", 0)), "First"),
            p(None, Some(("1", 1)), "Nested"),
            p(None, Some(("1", 0)), "Second"),
            p(None, None, "Rationale for the first rule"),
            p(None, None, "Rationale for the second rule"),
            p(None, None, "Rationale for the third rule"),
            p(None, None, "Closing words"),
            p(Some("ListBullet"), None, "Bullet by style"),
        ]
        .concat();
        format!(r#"<w:document xmlns:w="{W}"><w:body>{}</w:body></w:document>"#, body)
    }

    pub(crate) fn full_parts() -> DocumentParts {
        DocumentParts::new()
            .with(PartKind::Styles, styles_xml())
            .with(PartKind::Numbering, numbering_xml())
            .with(PartKind::Document, document_xml())
    }

    #[test]
    fn test_no_parts_is_an_error() {
        let result = Pipeline::default().run(&DocumentParts::new());
        assert!(matches!(result, Err(DocxError::NoParts)));
    }

    #[test]
    fn test_full_run() {
        let output = Pipeline::default().run(&full_parts()).unwrap();

        // Theme and settings were not supplied.
        assert_eq!(output.diagnostic_count(DiagnosticKind::MissingPart), 2);
        assert_eq!(output.theme, ThemeInfo::office_default());

        assert!(output.structure.has_toc);
        assert_eq!(output.structure.toc_entries.len(), 1);
        assert_eq!(output.structure.toc_entries[0].text, "Contents");
        assert_eq!(output.structure.toc_entries[0].page_number, Some(12));

        let patterns = &output.structure.special_patterns;
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern_kind, PatternKind::WordForWord);
        assert_eq!(patterns[0].occurrence_count, 3);

        let first = &output.structure.lists[0];
        assert_eq!(first.num_id, "1");

        // Style-inherited numbering: level found through the level's pStyle.
        let bullet = output.paragraphs.last().unwrap();
        assert_eq!(bullet.numbering(), Some(("2", 0)));

        assert!(output.css().contains(".docx-list-1 {"));
        assert!(output.css().contains("font-size: 12pt;"));
        assert!(!output.stylesheet.is_fallback);
    }

    #[test]
    fn test_reconstructed_list_nesting() {
        let output = Pipeline::default().run(&full_parts()).unwrap();
        let list = output
            .document
            .nodes
            .iter()
            .find_map(|n| match n {
                DocNode::List(list) if list.num_id == "1" => Some(list),
                _ => None,
            })
            .unwrap();
        let items: Vec<_> = list.items().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].marker.as_deref(), Some("1."));
        let sub = items[0].sublist.as_ref().unwrap();
        assert_eq!(sub.items().count(), 1);
        assert_eq!(items[1].marker.as_deref(), Some("2."));
        // The promoted "Rationale for ..." paragraphs right after the list stay in it.
        let specials = list
            .entries
            .iter()
            .filter(|e| matches!(e, ListEntry::Special { .. }))
            .count();
        assert_eq!(specials, 3);
    }

    #[test]
    fn test_supplied_paragraphs_skip_document_part() {
        let parts = DocumentParts::new()
            .with(PartKind::Styles, styles_xml())
            .with_paragraphs(vec![
                ParagraphRecord::new(0, "Intro"),
                ParagraphRecord::new(1, "Bullet").with_style("ListBullet"),
                ParagraphRecord::new(2, "Entry").with_style("TOC1"),
            ]);
        let output = Pipeline::default().run(&parts).unwrap();
        assert_eq!(output.paragraphs.len(), 3);
        // Numbering part missing: the inherited numId points nowhere.
        assert_eq!(output.paragraphs[1].numbering(), Some(("2", 0)));
        assert_eq!(output.diagnostic_count(DiagnosticKind::UnresolvableReference), 1);
        // Tabs come from the TOC1 style.
        assert_eq!(output.paragraphs[2].tabs.len(), 1);
        // The document part was never required.
        assert!(output.diagnostics.iter().all(|d| d.part != "document" || d.kind != DiagnosticKind::MissingPart));
    }

    #[test]
    fn test_unparseable_part_uses_defaults() {
        let parts = full_parts().with(PartKind::Styles, "<w:styles><unclosed>");
        let output = Pipeline::default().run(&parts).unwrap();
        assert!(output.styles.is_empty());
        assert!(output
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::MissingPart && d.part == "styles"));
        assert!(output.structure.has_toc);
    }

    #[test]
    fn test_out_of_range_lengths_are_dropped() {
        let styles = format!(
            r#"<w:styles xmlns:w="{W}">
  <w:style w:type="paragraph" w:styleId="Wide"><w:pPr><w:ind w:left="1e300" w:right="720"/></w:pPr>
    <w:rPr><w:sz w:val="99999999999999"/></w:rPr></w:style>
</w:styles>"#
        );
        let parts = full_parts().with(PartKind::Styles, styles);
        let output = Pipeline::default().run(&parts).unwrap();
        assert!(!output.stylesheet.is_fallback);
        let rule = output
            .css()
            .split("}\n")
            .find(|r| r.starts_with(".docx-wide {"))
            .unwrap();
        assert!(rule.contains("margin-right: 36pt;"));
        assert!(!rule.contains("margin-left"));
        assert!(!rule.contains("font-size"));
    }

    #[test]
    fn test_progress_reported() {
        let progress = Arc::new(Mutex::new(Vec::new()));
        let progress_clone = progress.clone();

        let pipeline = PipelineBuilder::new()
            .progress_reporter(Box::new(move |frac, msg| {
                progress_clone.lock().unwrap().push((frac, msg.to_string()));
            }))
            .build()
            .unwrap();
        pipeline.run(&full_parts()).unwrap();

        let progress = progress.lock().unwrap();
        assert!(progress.len() >= 5);
        assert_eq!(progress.first().unwrap().0, 0.0);
        assert_eq!(progress.last().unwrap().0, 1.0);
    }

    #[test]
    fn test_builder_rejects_invalid_options() {
        let options = ConversionOptions {
            class_prefix: "9bad".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            PipelineBuilder::new().options(options).build(),
            Err(DocxError::Config(_))
        ));
    }

    #[test]
    fn test_structure_json() {
        let output = Pipeline::default().run(&full_parts()).unwrap();
        let json = output.structure_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["structure"]["has_toc"], serde_json::Value::Bool(true));
        assert!(value["document"]["nodes"].as_array().unwrap().len() > 3);
    }

    #[test]
    fn test_namespace_overrides_apply() {
        let mut options = ConversionOptions::default();
        options
            .namespace_overrides
            .insert("w".to_string(), "urn:custom-word".to_string());
        let styles = r#"<x:styles xmlns:x="urn:custom-word"><x:style x:type="paragraph" x:styleId="Custom"/></x:styles>"#;
        let parts = DocumentParts::new().with(PartKind::Styles, styles);
        let output = Pipeline::new(options).run(&parts).unwrap();
        assert!(output.styles.get(docx_styles::StyleKind::Paragraph, "Custom").is_some());
    }
}
