//! Structure inference over the flat paragraph stream: table of contents,
//! recurring special paragraphs, list membership, and the nested tree
//! rebuilt from them.

pub mod analyzer;
pub mod body;
pub mod patterns;
pub mod reconstruct;

pub use analyzer::StructureAnalyzer;
pub use reconstruct::{ReconstructedDocument, Reconstructor};
