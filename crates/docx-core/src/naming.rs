//! Class and counter names shared by the stylesheet and the reconstructed tree.
//!
//! Both sides must derive the same names from the same ids, so every name the
//! stylesheet keys off is built here.

/// Lowercase a style or numbering id and replace anything that is not an
/// ASCII letter or digit with `-`. Runs of replaced characters collapse and
/// the result never starts or ends with `-`.
pub fn slug(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    let mut pending_dash = false;
    for c in id.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        out.push('x');
    }
    out
}

/// Class on the element wrapping one list group.
pub fn list_class(prefix: &str, num_id: &str) -> String {
    format!("{}-list-{}", prefix, slug(num_id))
}

/// Class on a list nested inside a group, whose shallowest item is `level`.
pub fn sublist_class(prefix: &str, num_id: &str, level: u8) -> String {
    format!("{}-list-{}-{}", prefix, slug(num_id), level)
}

/// Class on one list item at `level`.
pub fn item_class(prefix: &str, num_id: &str, level: u8) -> String {
    format!("{}-num-{}-{}", prefix, slug(num_id), level)
}

/// CSS counter driving the marker of `(num_id, level)`.
pub fn counter_name(prefix: &str, num_id: &str, level: u8) -> String {
    format!("{}-c-{}-{}", prefix, slug(num_id), level)
}

/// Class on one TOC line at 1-based `level`.
pub fn toc_class(prefix: &str, level: u8) -> String {
    format!("{}-toc-{}", prefix, level)
}

/// Leading slug segments owned by the structural names above and by the
/// character and table style classes.
const RESERVED_SEGMENTS: [&str; 6] = ["list", "num", "c", "toc", "char", "table"];

/// Base class for a style: `<prefix>-<infix>-<slug>`, or `<prefix>-<slug>`
/// for paragraph styles (empty `infix`). A paragraph slug that starts with a
/// reserved segment moves under `<prefix>-style-` so a style named `List 1`
/// or `TOC 2` cannot take a list or TOC class.
pub fn style_class(prefix: &str, infix: &str, id: &str) -> String {
    let slug = slug(id);
    if !infix.is_empty() {
        return format!("{}-{}-{}", prefix, infix, slug);
    }
    let first = slug.split('-').next().unwrap_or_default();
    if RESERVED_SEGMENTS.contains(&first) {
        format!("{}-style-{}", prefix, slug)
    } else {
        format!("{}-{}", prefix, slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Heading1"), "heading1");
        assert_eq!(slug("List Paragraph"), "list-paragraph");
        assert_eq!(slug("a__b"), "a-b");
        assert_eq!(slug("_Toc"), "toc");
        assert_eq!(slug("Überschrift"), "berschrift");
        assert_eq!(slug("%%"), "x");
    }

    #[test]
    fn test_list_names() {
        assert_eq!(list_class("docx", "3"), "docx-list-3");
        assert_eq!(sublist_class("docx", "3", 1), "docx-list-3-1");
        assert_eq!(item_class("docx", "3", 1), "docx-num-3-1");
        assert_eq!(counter_name("docx", "3", 1), "docx-c-3-1");
        assert_eq!(toc_class("docx", 2), "docx-toc-2");
    }

    #[test]
    fn test_style_class_avoids_structural_names() {
        assert_eq!(style_class("docx", "", "Heading1"), "docx-heading1");
        assert_eq!(style_class("docx", "", "List 1"), "docx-style-list-1");
        assert_eq!(style_class("docx", "", "TOC-2"), "docx-style-toc-2");
        assert_eq!(style_class("docx", "", "Num 3 1"), "docx-style-num-3-1");
        assert_eq!(style_class("docx", "", "Listing"), "docx-listing");
        assert_eq!(style_class("docx", "char", "List 1"), "docx-char-list-1");
        assert_ne!(style_class("docx", "", "List 1"), list_class("docx", "1"));
        assert_ne!(style_class("docx", "", "toc 2"), toc_class("docx", 2));
    }
}
