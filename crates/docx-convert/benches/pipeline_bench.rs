//! Benchmarks for the conversion stages.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use docx_convert::{convert_batch, DocumentParts, PartKind, Pipeline};
use docx_core::error::Diagnostics;
use docx_core::model::ParagraphRecord;
use docx_core::options::ConversionOptions;
use docx_structure::StructureAnalyzer;
use docx_styles::NumberingTable;
use docx_utils::xml::{Namespaces, XmlDocument};

const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

fn numbering_xml(instances: usize) -> String {
    let mut xml = format!(r#"<w:numbering xmlns:w="{}">"#, W);
    xml.push_str(r#"<w:abstractNum w:abstractNumId="0">"#);
    for lvl in 0..9 {
        xml.push_str(&format!(
            r#"<w:lvl w:ilvl="{0}"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1.%{1}."/><w:pPr><w:ind w:left="{2}" w:hanging="360"/></w:pPr></w:lvl>"#,
            lvl,
            lvl + 1,
            720 * (lvl + 1)
        ));
    }
    xml.push_str("</w:abstractNum>");
    for i in 1..=instances {
        xml.push_str(&format!(
            r#"<w:num w:numId="{}"><w:abstractNumId w:val="0"/><w:lvlOverride w:ilvl="0"><w:startOverride w:val="{}"/></w:lvlOverride></w:num>"#,
            i, i
        ));
    }
    xml.push_str("</w:numbering>");
    xml
}

fn styles_xml(count: usize) -> String {
    let mut xml = format!(r#"<w:styles xmlns:w="{}">"#, W);
    xml.push_str(r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:rPr><w:sz w:val="22"/></w:rPr></w:style>"#);
    for i in 0..count {
        let parent = if i == 0 { "Normal".to_string() } else { format!("Style{}", i - 1) };
        xml.push_str(&format!(
            r#"<w:style w:type="paragraph" w:styleId="Style{}"><w:basedOn w:val="{}"/><w:pPr><w:spacing w:before="{}"/></w:pPr></w:style>"#,
            i,
            parent,
            i * 20
        ));
    }
    xml.push_str("</w:styles>");
    xml
}

fn paragraphs(count: usize) -> Vec<ParagraphRecord> {
    (0..count)
        .map(|i| match i % 10 {
            0..=5 => ParagraphRecord::new(i, format!("Item {}", i)).with_numbering(((i / 50) + 1).to_string(), (i % 3) as u8),
            6 => ParagraphRecord::new(i, format!("Rationale for rule {}", i)),
            _ => ParagraphRecord::new(i, format!("Body text paragraph number {}", i)),
        })
        .collect()
}

fn parts(count: usize) -> DocumentParts {
    DocumentParts::new()
        .with(PartKind::Styles, styles_xml(40))
        .with(PartKind::Numbering, numbering_xml(20))
        .with_paragraphs(paragraphs(count))
}

fn bench_numbering(c: &mut Criterion) {
    let mut group = c.benchmark_group("Numbering");
    let xml = numbering_xml(100);

    group.bench_function("parse_100_instances", |b| {
        b.iter(|| {
            let doc = XmlDocument::parse(black_box(&xml), &Namespaces::ooxml()).unwrap();
            black_box(NumberingTable::from_xml(&doc, &mut Diagnostics::new()));
        })
    });

    let doc = XmlDocument::parse(&xml, &Namespaces::ooxml()).unwrap();
    let table = NumberingTable::from_xml(&doc, &mut Diagnostics::new());
    group.bench_function("effective_levels_100_instances", |b| {
        b.iter(|| {
            for id in table.instance_ids() {
                black_box(table.effective_levels(id));
            }
        })
    });

    group.finish();
}

fn bench_structure(c: &mut Criterion) {
    let mut group = c.benchmark_group("Structure");
    let options = ConversionOptions::default();
    let records = paragraphs(2000);

    group.bench_function("analyze_2000_paragraphs", |b| {
        let analyzer = StructureAnalyzer::new(&options);
        b.iter(|| black_box(analyzer.analyze(black_box(&records))))
    });

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pipeline");
    let pipeline = Pipeline::default();
    let single = parts(1000);

    group.bench_function("run_1000_paragraphs", |b| {
        b.iter(|| black_box(pipeline.run(black_box(&single)).unwrap()))
    });

    let batch: Vec<DocumentParts> = (0..8).map(|_| parts(500)).collect();
    group.bench_function("batch_8_documents", |b| {
        b.iter(|| black_box(convert_batch(&pipeline, black_box(&batch))))
    });

    group.finish();
}

criterion_group!(benches, bench_numbering, bench_structure, bench_pipeline);
criterion_main!(benches);
