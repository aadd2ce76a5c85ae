//! Decoding of raw package parts to UTF-8.
//!
//! Word writes its XML parts as UTF-8, but parts produced by other tools are
//! occasionally UTF-16 (with BOM) or declare a legacy encoding.

use encoding_rs::Encoding;

/// Decode an XML part: BOM first, then the XML declaration, then UTF-8,
/// finally Windows-1252. Returns the text and the encoding used.
pub fn decode_part(bytes: &[u8]) -> (String, &'static str) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return (strip_declared_encoding(text.into_owned()), encoding.name());
    }

    if let Some(label) = detect_xml_encoding(bytes) {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            if encoding != encoding_rs::UTF_8 {
                let (text, _) = encoding.decode_without_bom_handling(bytes);
                return (strip_declared_encoding(text.into_owned()), encoding.name());
            }
        }
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), "UTF-8"),
        Err(_) => {
            log::debug!("Part is not valid UTF-8, decoding as Windows-1252");
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            (text.into_owned(), "windows-1252")
        }
    }
}

/// Look for `<?xml ... encoding="..." ?>` in the first bytes of a part.
pub fn detect_xml_encoding(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(512)];
    let head_str = String::from_utf8_lossy(head);
    let decl_end = head_str.find("?>")?;
    let decl = &head_str[..decl_end];

    let start = decl.find("encoding=")?;
    let rest = &decl[start + 9..];
    let quote = rest.chars().next()?;
    if quote == '"' || quote == '\'' {
        let rest = &rest[1..];
        if let Some(end) = rest.find(quote) {
            return Some(rest[..end].to_string());
        }
    }
    None
}

/// Once decoded, the declared encoding no longer describes the text; drop it
/// so the XML reader does not try to honour it.
fn strip_declared_encoding(text: String) -> String {
    let Some(decl_end) = text.find("?>") else {
        return text;
    };
    if !text.starts_with("<?xml") {
        return text;
    }
    let decl = &text[..decl_end];
    let Some(start) = decl.find(" encoding=") else {
        return text;
    };
    let value = &decl[start + 10..];
    let Some(quote) = value.chars().next().filter(|q| *q == '"' || *q == '\'') else {
        return text;
    };
    match value.get(1..).and_then(|rest| rest.find(quote)) {
        Some(close) => {
            let end = start + 10 + 1 + close + 1;
            format!("{}{}", &text[..start], &text[end..])
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        let (text, enc) = decode_part(b"<a>Hello</a>");
        assert_eq!(text, "<a>Hello</a>");
        assert_eq!(enc, "UTF-8");
    }

    #[test]
    fn test_decode_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"<a/>");
        let (text, enc) = decode_part(&bytes);
        assert_eq!(text, "<a/>");
        assert_eq!(enc, "UTF-8");
    }

    #[test]
    fn test_decode_utf16le_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<?xml version=\"1.0\" encoding=\"UTF-16\"?><a/>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let (text, enc) = decode_part(&bytes);
        assert_eq!(enc, "UTF-16LE");
        assert_eq!(text, "<?xml version=\"1.0\"?><a/>");
    }

    #[test]
    fn test_declared_legacy_encoding() {
        let mut bytes = b"<?xml version=\"1.0\" encoding=\"windows-1252\"?><a>".to_vec();
        bytes.push(0xE9); // é
        bytes.extend_from_slice(b"</a>");
        let (text, enc) = decode_part(&bytes);
        assert_eq!(enc, "windows-1252");
        assert!(text.ends_with("<a>é</a>"));
    }

    #[test]
    fn test_malformed_declaration_kept() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"<?xml version=\"1.0\" encoding=?><a/>");
        let (text, enc) = decode_part(&bytes);
        assert_eq!(enc, "UTF-8");
        assert_eq!(text, "<?xml version=\"1.0\" encoding=?><a/>");

        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("<?xml version=\"1.0\" encoding=é?><a/>".as_bytes());
        let (text, _) = decode_part(&bytes);
        assert!(text.ends_with("<a/>"));

        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"<?xml version=\"1.0\" encoding=\"UTF-8?><a/>");
        let (text, _) = decode_part(&bytes);
        assert!(text.contains("encoding"));
    }

    #[test]
    fn test_detect_xml_encoding() {
        let xml = b"<?xml version=\"1.0\" encoding=\"iso-8859-1\"?><root/>";
        assert_eq!(detect_xml_encoding(xml), Some("iso-8859-1".to_string()));
        assert_eq!(detect_xml_encoding(b"<root/>"), None);
    }
}
