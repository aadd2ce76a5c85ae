//! Shared types for the docx style and structure pipeline.
//!
//! Every stage of the pipeline (style table, numbering, structure analysis,
//! stylesheet synthesis) exchanges data through the types defined here.

pub mod error;
pub mod model;
pub mod naming;
pub mod options;
pub mod units;
