//! Tokenizer for numbering level-text patterns such as `"%1.%2."`.
//!
//! `%n` (n = 1..9) refers to the counter of level n-1. A `%` that is not
//! followed by such a digit is literal text.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LevelToken {
    /// 0-based level whose counter is shown.
    pub level_ref: u8,
    /// Text before the first placeholder; empty on every other token.
    pub literal_before: String,
    /// Text after the last placeholder; empty on every other token.
    pub literal_after: String,
    /// Text between this placeholder and the next one.
    pub separator: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LevelText {
    pub tokens: Vec<LevelToken>,
    /// The whole pattern when it holds no placeholder (bullets, fixed text).
    pub literal: Option<String>,
}

impl LevelText {
    pub fn is_literal(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Levels referenced by the pattern, in order of appearance.
    pub fn referenced_levels(&self) -> impl Iterator<Item = u8> + '_ {
        self.tokens.iter().map(|t| t.level_ref)
    }

    /// Expand the pattern, asking `counter` for the text of each level.
    pub fn render(&self, mut counter: impl FnMut(u8) -> String) -> String {
        if let Some(lit) = &self.literal {
            return lit.clone();
        }
        let mut out = String::new();
        for token in &self.tokens {
            out.push_str(&token.literal_before);
            out.push_str(&counter(token.level_ref));
            out.push_str(&token.separator);
            out.push_str(&token.literal_after);
        }
        out
    }
}

pub fn parse(pattern: &str) -> LevelText {
    // Split into alternating literal chunks and placeholder refs:
    // chunks.len() == refs.len() + 1.
    let mut chunks: Vec<String> = vec![String::new()];
    let mut refs: Vec<u8> = Vec::new();

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            if let Some(d) = chars.peek().and_then(|d| d.to_digit(10)).filter(|d| (1..=9).contains(d)) {
                chars.next();
                refs.push((d - 1) as u8);
                chunks.push(String::new());
                continue;
            }
        }
        if let Some(last) = chunks.last_mut() {
            last.push(c);
        }
    }

    if refs.is_empty() {
        return LevelText {
            tokens: Vec::new(),
            literal: Some(pattern.to_string()),
        };
    }

    let last = refs.len() - 1;
    let tokens = refs
        .iter()
        .enumerate()
        .map(|(i, &level_ref)| LevelToken {
            level_ref,
            literal_before: if i == 0 { chunks[0].clone() } else { String::new() },
            separator: if i < last { chunks[i + 1].clone() } else { String::new() },
            literal_after: if i == last { chunks[i + 1].clone() } else { String::new() },
        })
        .collect();

    LevelText {
        tokens,
        literal: None,
    }
}

/// Replace Symbol/Wingdings private-use glyphs used for bullets with their
/// Unicode look-alikes. A lone `o` (the Courier New hollow bullet) becomes `◦`.
pub fn display_literal(raw: &str) -> String {
    if raw == "o" {
        return "\u{25E6}".to_string();
    }
    raw.chars().map(map_symbol_glyph).collect()
}

fn map_symbol_glyph(c: char) -> char {
    match c {
        '\u{F0B7}' | '\u{F06C}' => '\u{2022}',
        '\u{F0A7}' | '\u{F06E}' => '\u{25AA}',
        '\u{F0D8}' => '\u{27A2}',
        '\u{F0FC}' => '\u{2713}',
        '\u{F076}' => '\u{2756}',
        '\u{F0A8}' => '\u{25C6}',
        '\u{F02D}' => '-',
        '\u{F000}'..='\u{F0FF}' => '\u{2022}',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_level_pattern() {
        let parsed = parse("%1.%2.");
        assert_eq!(parsed.tokens.len(), 2);
        assert_eq!(parsed.tokens[0].level_ref, 0);
        assert_eq!(parsed.tokens[0].separator, ".");
        assert_eq!(parsed.tokens[0].literal_after, "");
        assert_eq!(parsed.tokens[1].level_ref, 1);
        assert_eq!(parsed.tokens[1].literal_after, ".");
        assert_eq!(parsed.render(|l| (l + 1).to_string()), "1.2.");
    }

    #[test]
    fn test_surrounding_literals() {
        let parsed = parse("(%1)");
        assert_eq!(parsed.tokens[0].literal_before, "(");
        assert_eq!(parsed.tokens[0].literal_after, ")");

        let parsed = parse("Article %1 -");
        assert_eq!(parsed.render(|_| "IV".into()), "Article IV -");
    }

    #[test]
    fn test_literal_only() {
        let parsed = parse("\u{F0B7}");
        assert!(parsed.is_literal());
        assert_eq!(parsed.literal.as_deref(), Some("\u{F0B7}"));

        let empty = parse("");
        assert_eq!(empty.literal.as_deref(), Some(""));
    }

    #[test]
    fn test_display_literal() {
        assert_eq!(display_literal("\u{F0B7}"), "\u{2022}");
        assert_eq!(display_literal("\u{F0A7}"), "\u{25AA}");
        assert_eq!(display_literal("o"), "\u{25E6}");
        assert_eq!(display_literal("\u{F0E0}"), "\u{2022}");
        assert_eq!(display_literal("-"), "-");
    }

    #[test]
    fn test_percent_without_digit_is_literal() {
        let parsed = parse("%1%");
        assert_eq!(parsed.tokens.len(), 1);
        assert_eq!(parsed.tokens[0].literal_after, "%");
        assert_eq!(parse("%0").literal.as_deref(), Some("%0"));
    }
}
