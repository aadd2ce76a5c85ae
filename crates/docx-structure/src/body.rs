//! Reads `word/document.xml` into the flat [`ParagraphRecord`] stream the
//! analyzer consumes.
//!
//! Only what the structure pass needs is kept: paragraph style, numbering,
//! tab stops, visible text, and where a TOC field or TOC content control
//! begins and ends. Inline formatting is not extracted.

use docx_core::error::{DiagnosticKind, Diagnostics};
use docx_core::model::ParagraphRecord;
use docx_styles::props::{parse_tabs, NumberingRef};
use docx_utils::xml::{val_of, Element, XmlDocument};

const PART: &str = "document";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    /// `w:fldChar begin` seen, instruction not read yet.
    Pending,
    Toc,
    Other,
}

struct BodyReader {
    records: Vec<ParagraphRecord>,
    /// Open complex fields, innermost last.
    fields: Vec<FieldKind>,
    /// A TOC content control opened and no paragraph has claimed it yet.
    pending_toc_sdt: bool,
}

impl BodyReader {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            fields: Vec::new(),
            pending_toc_sdt: false,
        }
    }

    /// Walk block-level content: paragraphs, tables, content controls.
    fn walk_blocks(&mut self, parent: &Element<'_>) {
        for child in parent.children() {
            if child.is("w:p") {
                self.paragraph(&child);
            } else if child.is("w:tbl") || child.is("w:tr") || child.is("w:tc") {
                self.walk_blocks(&child);
            } else if child.is("w:sdt") {
                self.block_sdt(&child);
            } else if child.is("w:customXml") || child.is("w:sdtContent") {
                self.walk_blocks(&child);
            }
        }
    }

    fn block_sdt(&mut self, sdt: &Element<'_>) {
        let is_toc = sdt
            .path("w:sdtPr/w:docPartObj/w:docPartGallery")
            .and_then(|g| g.attr("w:val"))
            .map(|v| v.eq_ignore_ascii_case("Table of Contents"))
            .unwrap_or(false);
        let Some(content) = sdt.child("w:sdtContent") else {
            return;
        };
        if !is_toc {
            self.walk_blocks(&content);
            return;
        }

        let first = self.records.len();
        self.pending_toc_sdt = true;
        self.walk_blocks(&content);
        self.pending_toc_sdt = false;
        if let Some(last) = self.records.get_mut(first..).and_then(|r| r.last_mut()) {
            last.toc_field_end = true;
        }
    }

    fn paragraph(&mut self, p: &Element<'_>) {
        let mut record = ParagraphRecord::new(self.records.len(), String::new());
        if self.pending_toc_sdt {
            record.toc_field_begin = true;
            self.pending_toc_sdt = false;
        }

        if let Some(ppr) = p.child("w:pPr") {
            record.style_id = val_of(&ppr, "w:pStyle").map(|s| s.to_string());
            if let Some(num_pr) = ppr.child("w:numPr") {
                let num = NumberingRef::parse(&num_pr);
                record.num_id = num.num_id;
                record.level = num.level;
            }
            if let Some(tabs) = ppr.child("w:tabs") {
                record.tabs = parse_tabs(&tabs);
            }
        }

        let mut text = String::new();
        self.inline(p, &mut record, &mut text);
        record.text = text;
        self.records.push(record);
    }

    /// Walk run-level content in document order.
    fn inline(&mut self, parent: &Element<'_>, record: &mut ParagraphRecord, text: &mut String) {
        for child in parent.children() {
            match child.local_name() {
                "pPr" | "rPr" | "del" | "moveFrom" => {}
                "t" => text.push_str(&child.own_text()),
                "tab" => text.push('\t'),
                "br" | "cr" => text.push('\n'),
                "noBreakHyphen" => text.push('-'),
                "fldChar" => self.field_char(&child, record),
                "instrText" => self.instruction(&child.own_text(), record),
                "fldSimple" => {
                    let is_toc = child
                        .attr("w:instr")
                        .map(is_toc_instruction)
                        .unwrap_or(false);
                    if is_toc {
                        record.toc_field_begin = true;
                    }
                    self.inline(&child, record, text);
                    if is_toc {
                        record.toc_field_end = true;
                    }
                }
                // Text boxes and drawings hold their own paragraphs.
                "txbxContent" | "drawing" | "pict" => {}
                _ => self.inline(&child, record, text),
            }
        }
    }

    fn field_char(&mut self, el: &Element<'_>, record: &mut ParagraphRecord) {
        match el.attr("w:fldCharType") {
            Some("begin") => self.fields.push(FieldKind::Pending),
            Some("end") => {
                if self.fields.pop() == Some(FieldKind::Toc) {
                    record.toc_field_end = true;
                }
            }
            _ => {}
        }
    }

    fn instruction(&mut self, instr: &str, record: &mut ParagraphRecord) {
        if let Some(top) = self.fields.last_mut() {
            if *top == FieldKind::Pending && !instr.trim().is_empty() {
                *top = if is_toc_instruction(instr) {
                    record.toc_field_begin = true;
                    FieldKind::Toc
                } else {
                    FieldKind::Other
                };
            }
        }
    }
}

fn is_toc_instruction(instr: &str) -> bool {
    instr
        .split_whitespace()
        .next()
        .map(|w| w.eq_ignore_ascii_case("TOC"))
        .unwrap_or(false)
}

/// Extract the paragraph stream from a parsed document part.
pub fn read_paragraphs(doc: &XmlDocument, diagnostics: &mut Diagnostics) -> Vec<ParagraphRecord> {
    let root = doc.root();
    let Some(body) = root.child("w:body") else {
        diagnostics.push(
            DiagnosticKind::QueryFailure,
            PART,
            format!("no w:body under <{}>", root.local_name()),
        );
        return Vec::new();
    };

    let mut reader = BodyReader::new();
    reader.walk_blocks(&body);
    if !reader.fields.is_empty() {
        log::debug!("{} field(s) left open at end of body", reader.fields.len());
    }
    log::debug!("Read {} paragraphs from document body", reader.records.len());
    reader.records
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_core::model::{TabAlignment, TabLeader};
    use docx_utils::xml::Namespaces;

    fn read(body: &str) -> Vec<ParagraphRecord> {
        let xml = format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        let doc = XmlDocument::parse(&xml, &Namespaces::ooxml()).unwrap();
        read_paragraphs(&doc, &mut Diagnostics::new())
    }

    #[test]
    fn test_plain_and_numbered_paragraphs() {
        let records = read(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Intro</w:t></w:r><w:r><w:t xml:space="preserve"> text</w:t></w:r></w:p>
               <w:p><w:pPr><w:numPr><w:ilvl w:val="1"/><w:numId w:val="3"/></w:numPr></w:pPr><w:r><w:t>item</w:t></w:r></w:p>
               <w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        );
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].style_id.as_deref(), Some("Heading1"));
        assert_eq!(records[0].text, "Intro text");
        assert_eq!(records[1].numbering(), Some(("3", 1)));
        assert_eq!(records[2].text, "cell");
        assert_eq!(records[2].index, 2);
    }

    #[test]
    fn test_complex_toc_field() {
        let records = read(
            r#"<w:p><w:pPr><w:pStyle w:val="TOC1"/><w:tabs><w:tab w:val="right" w:leader="dot" w:pos="9350"/></w:tabs></w:pPr>
                 <w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText xml:space="preserve"> TOC \o "1-3" \h \z \u </w:instrText></w:r>
                 <w:r><w:fldChar w:fldCharType="separate"/></w:r>
                 <w:hyperlink w:anchor="_Toc1"><w:r><w:t>Scope</w:t></w:r><w:r><w:tab/></w:r>
                   <w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText> PAGEREF _Toc1 \h </w:instrText></w:r>
                   <w:r><w:fldChar w:fldCharType="separate"/></w:r><w:r><w:t>1</w:t></w:r><w:r><w:fldChar w:fldCharType="end"/></w:r>
                 </w:hyperlink></w:p>
               <w:p><w:pPr><w:pStyle w:val="TOC1"/></w:pPr><w:r><w:t>Terms</w:t></w:r><w:r><w:tab/></w:r><w:r><w:t>2</w:t></w:r></w:p>
               <w:p><w:r><w:fldChar w:fldCharType="end"/></w:r></w:p>
               <w:p><w:r><w:t>Body</w:t></w:r></w:p>"#,
        );
        assert_eq!(records.len(), 4);
        assert!(records[0].toc_field_begin);
        assert!(!records[0].toc_field_end);
        assert_eq!(records[0].text, "Scope\t1");
        assert_eq!(records[0].tabs[0].alignment, TabAlignment::Right);
        assert_eq!(records[0].tabs[0].leader, TabLeader::Dot);
        assert!(records[2].toc_field_end);
        assert!(!records[3].toc_field_begin && !records[3].toc_field_end);
    }

    #[test]
    fn test_toc_content_control() {
        let records = read(
            r#"<w:sdt><w:sdtPr><w:docPartObj><w:docPartGallery w:val="Table of Contents"/><w:docPartUnique/></w:docPartObj></w:sdtPr>
                 <w:sdtContent>
                   <w:p><w:r><w:t>Contents</w:t></w:r></w:p>
                   <w:p><w:r><w:t>Scope</w:t></w:r><w:r><w:tab/><w:t>1</w:t></w:r></w:p>
                 </w:sdtContent></w:sdt>
               <w:p><w:r><w:t>After</w:t></w:r></w:p>"#,
        );
        assert_eq!(records.len(), 3);
        assert!(records[0].toc_field_begin);
        assert!(records[1].toc_field_end);
        assert!(!records[2].toc_field_begin);
    }

    #[test]
    fn test_simple_field_and_deleted_text() {
        let records = read(
            r#"<w:p><w:fldSimple w:instr=" TOC \o &quot;1-2&quot; "><w:r><w:t>Overview 3</w:t></w:r></w:fldSimple></w:p>
               <w:p><w:del><w:r><w:delText>gone</w:delText></w:r></w:del><w:ins><w:r><w:t>kept</w:t></w:r></w:ins></w:p>"#,
        );
        assert!(records[0].toc_field_begin && records[0].toc_field_end);
        assert_eq!(records[0].text, "Overview 3");
        assert_eq!(records[1].text, "kept");
    }

    #[test]
    fn test_missing_body() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"/>"#;
        let doc = XmlDocument::parse(xml, &Namespaces::ooxml()).unwrap();
        let mut diags = Diagnostics::new();
        assert!(read_paragraphs(&doc, &mut diags).is_empty());
        assert_eq!(diags.count(DiagnosticKind::QueryFailure), 1);
    }
}
