//! CSS generation for a converted Word document: one class per style, one
//! counter per numbering level, plus a fixed fallback stylesheet.

pub mod baseline;
pub mod synthesizer;

pub use baseline::BASELINE_CSS;
pub use synthesizer::{synthesize, ClassNameMap, Stylesheet};
