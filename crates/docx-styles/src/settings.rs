//! Document-wide settings from `word/settings.xml` that affect rendering.

use serde::Serialize;

use docx_core::error::{DiagnosticKind, Diagnostics};
use docx_core::units::Twips;
use docx_utils::xml::{int_attr, on_off, XmlDocument};

const PART: &str = "settings";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSettings {
    pub default_tab_stop: Twips,
    pub auto_hyphenation: bool,
    pub even_and_odd_headers: bool,
    /// `compatibilityMode` compat setting: 11 = Word 2003 ... 15 = Word 2013+.
    pub compatibility_mode: Option<u32>,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            default_tab_stop: Twips(720),
            auto_hyphenation: false,
            even_and_odd_headers: false,
            compatibility_mode: None,
        }
    }
}

impl DocumentSettings {
    pub fn from_xml(doc: &XmlDocument, diagnostics: &mut Diagnostics) -> Self {
        let root = doc.root();
        let mut settings = DocumentSettings::default();
        if !root.is("w:settings") {
            diagnostics.push(
                DiagnosticKind::MalformedNode,
                PART,
                format!("unexpected root element <{}>", root.local_name()),
            );
            return settings;
        }

        if let Some(tab) = root.child("w:defaultTabStop").and_then(|t| int_attr(&t, "w:val")) {
            if tab > 0 {
                settings.default_tab_stop = Twips(tab);
            }
        }
        settings.auto_hyphenation = on_off(&root, "w:autoHyphenation").unwrap_or(false);
        settings.even_and_odd_headers = on_off(&root, "w:evenAndOddHeaders").unwrap_or(false);
        settings.compatibility_mode = root.child("w:compat").and_then(|compat| {
            compat
                .children_named("w:compatSetting")
                .into_iter()
                .find(|s| s.attr("w:name") == Some("compatibilityMode"))
                .and_then(|s| s.attr("w:val"))
                .and_then(|v| v.trim().parse().ok())
        });
        settings
    }

    /// Tab stop width in CSS character-independent form (`36pt`).
    pub fn tab_size_css(&self) -> String {
        self.default_tab_stop.to_points().to_string()
    }
}
