//! Options shared across the pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DocxError, Result};

/// All options controlling style resolution, structure analysis and
/// stylesheet synthesis. Every field has a default, so a TOML file only
/// needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    // -- Styles --
    /// Walk `basedOn` chains before emitting a style's rule.
    pub resolve_based_on: bool,
    /// Hop limit for `basedOn` walks.
    pub max_based_on_depth: usize,

    // -- Table of contents --
    /// Style ids (alphanumerics only, lowercased) starting with one of these
    /// tokens mark TOC paragraphs.
    pub toc_style_markers: Vec<String>,
    /// Entries required before an empty/Normal paragraph closes the TOC.
    pub toc_exit_min_entries: usize,

    // -- Special patterns --
    pub pattern_min_occurrences: usize,
    pub pattern_max_examples: usize,
    /// Paragraphs longer than this (in chars) are never shape-matched.
    pub pattern_max_length: usize,

    // -- Stylesheet --
    pub class_prefix: String,
    pub minify_css: bool,

    // -- Query facility --
    /// Extra or replacement prefix → namespace URI bindings.
    pub namespace_overrides: BTreeMap<String, String>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            resolve_based_on: true,
            max_based_on_depth: 32,
            toc_style_markers: vec![
                "toc".to_string(),
                "tableofcontents".to_string(),
                "contentsheading".to_string(),
            ],
            toc_exit_min_entries: 5,
            pattern_min_occurrences: 2,
            pattern_max_examples: 3,
            pattern_max_length: 200,
            class_prefix: "docx".to_string(),
            minify_css: false,
            namespace_overrides: BTreeMap::new(),
        }
    }
}

impl ConversionOptions {
    /// Parse options from TOML text and validate them.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let opts: ConversionOptions =
            toml::from_str(s).map_err(|e| DocxError::Config(e.to_string()))?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DocxError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.class_prefix.is_empty()
            || !self.class_prefix.starts_with(|c: char| c.is_ascii_alphabetic())
            || !self
                .class_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DocxError::Config(format!(
                "class_prefix must be a CSS identifier starting with a letter, got {:?}",
                self.class_prefix
            )));
        }
        if self.pattern_min_occurrences == 0 {
            return Err(DocxError::Config(
                "pattern_min_occurrences must be at least 1".to_string(),
            ));
        }
        if self.max_based_on_depth == 0 {
            return Err(DocxError::Config(
                "max_based_on_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
