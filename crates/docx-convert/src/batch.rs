//! Parallel conversion of independent documents.

use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;

use docx_core::error::{DocxError, Result};

use crate::parts::DocumentParts;
use crate::pipeline::{ConversionOutput, Pipeline};

/// Convert every document with the same pipeline. Results keep input order
/// and one document's failure, panics included, does not affect the others.
pub fn convert_batch(pipeline: &Pipeline, documents: &[DocumentParts]) -> Vec<Result<ConversionOutput>> {
    let results: Vec<Result<ConversionOutput>> = documents
        .par_iter()
        .enumerate()
        .map(|(i, parts)| {
            panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(parts))).unwrap_or_else(|_| {
                log::error!("Conversion of document {} panicked", i);
                Err(DocxError::Other(format!("conversion of document {} panicked", i)))
            })
        })
        .collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    log::info!(
        "Converted {} documents ({} failed)",
        results.len() - failed,
        failed
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parts::PartKind;
    use crate::pipeline::tests::{full_parts, numbering_xml, styles_xml};
    use crate::pipeline::PipelineBuilder;
    use docx_core::model::ParagraphRecord;

    #[test]
    fn test_batch_isolates_failures() {
        let documents = vec![full_parts(), DocumentParts::new(), full_parts()];
        let results = convert_batch(&Pipeline::default(), &documents);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(DocxError::NoParts)));
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_batch_matches_sequential() {
        let pipeline = Pipeline::default();
        let documents = vec![full_parts(); 4];
        let sequential = pipeline.run(&documents[0]).unwrap();
        for result in convert_batch(&pipeline, &documents) {
            let output = result.unwrap();
            assert_eq!(output.stylesheet, sequential.stylesheet);
            assert_eq!(output.structure, sequential.structure);
            assert_eq!(output.document, sequential.document);
        }
    }

    #[test]
    fn test_batch_survives_a_panicking_document() {
        let pipeline = PipelineBuilder::new()
            .progress_reporter(Box::new(|_, msg| {
                if msg == "3 paragraphs" {
                    panic!("reporter failed");
                }
            }))
            .build()
            .unwrap();
        let three = DocumentParts::new().with_paragraphs(
            (0..3).map(|i| ParagraphRecord::new(i, "text")).collect(),
        );
        let documents = vec![full_parts(), three, full_parts()];
        let results = convert_batch(&pipeline, &documents);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(&results[1], Err(DocxError::Other(msg)) if msg.contains("document 1")));
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_batch_with_out_of_range_values() {
        let hostile_numbering = numbering_xml()
            .replace(r#"<w:start w:val="1"/><w:numFmt w:val="decimal"/>"#, r#"<w:start w:val="4294967295"/><w:numFmt w:val="decimal"/>"#)
            .replace(r#"<w:start w:val="1"/><w:numFmt w:val="lowerLetter"/>"#, r#"<w:start w:val="2147483647"/><w:numFmt w:val="lowerLetter"/>"#);
        let hostile_styles = styles_xml()
            .replace(r#"<w:sz w:val="24"/>"#, r#"<w:sz w:val="1e300"/>"#)
            .replace(
                r#"<w:name w:val="Normal"/>"#,
                r#"<w:name w:val="Normal"/><w:pPr><w:ind w:left="-9223372036854775808" w:hanging="1e300"/>
                   <w:spacing w:line="1e300" w:lineRule="auto"/></w:pPr>"#,
            );
        let hostile = full_parts()
            .with(PartKind::Styles, hostile_styles)
            .with(PartKind::Numbering, hostile_numbering);
        let mut malformed_decl = vec![0xEF, 0xBB, 0xBF];
        malformed_decl.extend_from_slice(b"<?xml version=\"1.0\" encoding=?><w:settings/>");
        let odd_encoding = DocumentParts::from_entries([
            ("word/styles.xml", styles_xml().as_bytes()),
            ("word/settings.xml", malformed_decl.as_slice()),
        ]);

        let documents = vec![full_parts(), hostile, odd_encoding];
        let results = convert_batch(&Pipeline::default(), &documents);
        assert!(results.iter().all(|r| r.is_ok()));
        let hostile_out = results[1].as_ref().unwrap();
        assert!(!hostile_out.stylesheet.is_fallback);
        let markers: Vec<String> = hostile_out
            .document
            .lists()
            .flat_map(|l| l.items())
            .filter_map(|i| i.marker.clone())
            .collect();
        assert!(!markers.is_empty());
        // Clamped start of 32767 in lowerLetter is 1261 letters.
        assert!(markers.iter().all(|m| m.len() < 1300));
    }
}
