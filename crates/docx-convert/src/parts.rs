//! The raw inputs of one conversion.

use docx_core::model::ParagraphRecord;
use docx_utils::encoding::decode_part;

/// The package parts the pipeline reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Styles,
    Numbering,
    Document,
    Theme,
    Settings,
}

impl PartKind {
    pub const ALL: [PartKind; 5] = [
        PartKind::Styles,
        PartKind::Numbering,
        PartKind::Document,
        PartKind::Theme,
        PartKind::Settings,
    ];

    /// Name used in diagnostics and logs.
    pub fn name(self) -> &'static str {
        match self {
            PartKind::Styles => "styles",
            PartKind::Numbering => "numbering",
            PartKind::Document => "document",
            PartKind::Theme => "theme",
            PartKind::Settings => "settings",
        }
    }

    /// Identify a part from its path inside the package
    /// (`word/styles.xml`, `word/theme/theme1.xml`, ...).
    pub fn from_package_path(path: &str) -> Option<Self> {
        let path = path.trim_start_matches('/');
        match path {
            "word/styles.xml" => Some(PartKind::Styles),
            "word/numbering.xml" => Some(PartKind::Numbering),
            "word/document.xml" => Some(PartKind::Document),
            "word/settings.xml" => Some(PartKind::Settings),
            p if p.starts_with("word/theme/") && p.ends_with(".xml") => Some(PartKind::Theme),
            _ => None,
        }
    }
}

/// XML text of each part, any of which may be absent, plus an optional
/// paragraph stream produced by an external body converter.
#[derive(Debug, Clone, Default)]
pub struct DocumentParts {
    pub styles: Option<String>,
    pub numbering: Option<String>,
    pub document: Option<String>,
    pub theme: Option<String>,
    pub settings: Option<String>,
    /// When set, used instead of reading the document part.
    pub paragraphs: Option<Vec<ParagraphRecord>>,
}

impl DocumentParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: PartKind) -> Option<&str> {
        match kind {
            PartKind::Styles => self.styles.as_deref(),
            PartKind::Numbering => self.numbering.as_deref(),
            PartKind::Document => self.document.as_deref(),
            PartKind::Theme => self.theme.as_deref(),
            PartKind::Settings => self.settings.as_deref(),
        }
    }

    pub fn set(&mut self, kind: PartKind, xml: impl Into<String>) {
        let slot = match kind {
            PartKind::Styles => &mut self.styles,
            PartKind::Numbering => &mut self.numbering,
            PartKind::Document => &mut self.document,
            PartKind::Theme => &mut self.theme,
            PartKind::Settings => &mut self.settings,
        };
        *slot = Some(xml.into());
    }

    pub fn with(mut self, kind: PartKind, xml: impl Into<String>) -> Self {
        self.set(kind, xml);
        self
    }

    pub fn with_paragraphs(mut self, paragraphs: Vec<ParagraphRecord>) -> Self {
        self.paragraphs = Some(paragraphs);
        self
    }

    /// Decode raw part bytes (BOM or declared encoding) and store them.
    pub fn set_bytes(&mut self, kind: PartKind, bytes: &[u8]) {
        let (text, encoding) = decode_part(bytes);
        if encoding != "UTF-8" {
            log::debug!("Decoded {} part as {}", kind.name(), encoding);
        }
        self.set(kind, text);
    }

    /// Collect parts from `(package path, bytes)` pairs, ignoring entries
    /// that are not one of the five parts. The first theme wins.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Self {
        let mut parts = Self::new();
        for (path, bytes) in entries {
            let Some(kind) = PartKind::from_package_path(path) else {
                continue;
            };
            if parts.get(kind).is_some() {
                log::debug!("Ignoring duplicate {} part at {}", kind.name(), path);
                continue;
            }
            parts.set_bytes(kind, bytes);
        }
        parts
    }

    /// No XML part and no paragraph stream.
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_none() && PartKind::ALL.iter().all(|k| self.get(*k).is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_paths() {
        assert_eq!(PartKind::from_package_path("word/styles.xml"), Some(PartKind::Styles));
        assert_eq!(PartKind::from_package_path("/word/document.xml"), Some(PartKind::Document));
        assert_eq!(PartKind::from_package_path("word/theme/theme1.xml"), Some(PartKind::Theme));
        assert_eq!(PartKind::from_package_path("word/media/image1.png"), None);
        assert_eq!(PartKind::from_package_path("word/_rels/document.xml.rels"), None);
    }

    #[test]
    fn test_from_entries_decodes_utf16() {
        let mut utf16 = vec![0xFF, 0xFE];
        for unit in "<w:settings/>".encode_utf16() {
            utf16.extend_from_slice(&unit.to_le_bytes());
        }
        let parts = DocumentParts::from_entries([
            ("word/settings.xml", utf16.as_slice()),
            ("word/theme/theme1.xml", b"<a:theme/>".as_slice()),
            ("word/theme/theme2.xml", b"<other/>".as_slice()),
            ("[Content_Types].xml", b"<Types/>".as_slice()),
        ]);
        assert_eq!(parts.settings.as_deref(), Some("<w:settings/>"));
        assert_eq!(parts.theme.as_deref(), Some("<a:theme/>"));
        assert!(parts.styles.is_none());
        assert!(!parts.is_empty());
    }

    #[test]
    fn test_from_entries_keeps_malformed_declaration() {
        let mut settings = vec![0xEF, 0xBB, 0xBF];
        settings.extend_from_slice(b"<?xml version=\"1.0\" encoding=?><w:settings/>");
        let parts = DocumentParts::from_entries([("word/settings.xml", settings.as_slice())]);
        assert_eq!(
            parts.settings.as_deref(),
            Some("<?xml version=\"1.0\" encoding=?><w:settings/>")
        );
    }

    #[test]
    fn test_empty() {
        assert!(DocumentParts::new().is_empty());
        assert!(!DocumentParts::new().with_paragraphs(Vec::new()).is_empty());
        assert!(!DocumentParts::new().with(PartKind::Styles, "<w:styles/>").is_empty());
    }
}
