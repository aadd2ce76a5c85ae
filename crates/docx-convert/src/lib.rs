//! Pipeline entry point: turns the XML parts of one Word document into a
//! stylesheet and a reconstructed structure.
//!
//! Stages run in order on one thread per document:
//!   1. Parse styles, numbering, theme and settings (missing parts → defaults)
//!   2. Read or accept the paragraph stream, fill in style-inherited numbering
//!   3. Analyze structure (TOC, special patterns, lists)
//!   4. Rebuild the nested tree
//!   5. Synthesize the stylesheet

pub mod batch;
pub mod parts;
pub mod pipeline;

pub use batch::convert_batch;
pub use parts::{DocumentParts, PartKind};
pub use pipeline::{ConversionOutput, Pipeline, PipelineBuilder, ProgressReporter};
