//! Theme colors and fonts from `word/theme/theme1.xml`.

use std::collections::BTreeMap;

use serde::Serialize;

use docx_core::error::{DiagnosticKind, Diagnostics};
use docx_utils::xml::{Element, XmlDocument};

use crate::props::ColorValue;

const PART: &str = "theme";

/// Color roles of the default Office theme, used for roles a theme omits.
const OFFICE_COLORS: [(&str, &str); 12] = [
    ("dk1", "000000"),
    ("lt1", "FFFFFF"),
    ("dk2", "44546A"),
    ("lt2", "E7E6E6"),
    ("accent1", "4472C4"),
    ("accent2", "ED7D31"),
    ("accent3", "A5A5A5"),
    ("accent4", "FFC000"),
    ("accent5", "5B9BD5"),
    ("accent6", "70AD47"),
    ("hlink", "0563C1"),
    ("folHlink", "954F72"),
];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ThemeFonts {
    pub latin: Option<String>,
    pub east_asia: Option<String>,
    pub complex_script: Option<String>,
}

impl ThemeFonts {
    fn parse(el: &Element<'_>) -> Self {
        let typeface = |q: &str| {
            el.child(q)
                .and_then(|c| c.attr("typeface"))
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string())
        };
        Self {
            latin: typeface("a:latin"),
            east_asia: typeface("a:ea"),
            complex_script: typeface("a:cs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeInfo {
    pub name: Option<String>,
    /// Role (`dk1`, `accent1`, ...) → six uppercase hex digits.
    pub colors: BTreeMap<String, String>,
    pub major: ThemeFonts,
    pub minor: ThemeFonts,
}

impl Default for ThemeInfo {
    fn default() -> Self {
        Self::office_default()
    }
}

impl ThemeInfo {
    pub fn office_default() -> Self {
        Self {
            name: Some("Office Theme".to_string()),
            colors: OFFICE_COLORS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            major: ThemeFonts {
                latin: Some("Calibri Light".to_string()),
                ..Default::default()
            },
            minor: ThemeFonts {
                latin: Some("Calibri".to_string()),
                ..Default::default()
            },
        }
    }

    pub fn from_xml(doc: &XmlDocument, diagnostics: &mut Diagnostics) -> Self {
        let root = doc.root();
        let mut theme = ThemeInfo::office_default();
        let Some(elements) = root.child("a:themeElements") else {
            diagnostics.push(
                DiagnosticKind::MalformedNode,
                PART,
                "theme without a:themeElements, using Office defaults",
            );
            return theme;
        };
        theme.name = root.attr("name").map(|s| s.to_string());

        if let Some(scheme) = elements.child("a:clrScheme") {
            for role in scheme.children() {
                let value = role
                    .child("a:srgbClr")
                    .and_then(|c| c.attr("val"))
                    .or_else(|| role.child("a:sysClr").and_then(|c| c.attr("lastClr")));
                match value {
                    Some(v) if v.len() == 6 && v.chars().all(|c| c.is_ascii_hexdigit()) => {
                        theme
                            .colors
                            .insert(role.local_name().to_string(), v.to_ascii_uppercase());
                    }
                    _ => diagnostics.push(
                        DiagnosticKind::MalformedNode,
                        PART,
                        format!("color role {} has no usable value", role.local_name()),
                    ),
                }
            }
        }

        if let Some(fonts) = elements.child("a:fontScheme") {
            if let Some(major) = fonts.child("a:majorFont") {
                theme.major = merge_fonts(ThemeFonts::parse(&major), theme.major);
            }
            if let Some(minor) = fonts.child("a:minorFont") {
                theme.minor = merge_fonts(ThemeFonts::parse(&minor), theme.minor);
            }
        }
        theme
    }

    /// Map a WordprocessingML theme color name to its scheme role.
    pub fn role_for(name: &str) -> &str {
        match name {
            "text1" | "dark1" => "dk1",
            "background1" | "light1" => "lt1",
            "text2" | "dark2" => "dk2",
            "background2" | "light2" => "lt2",
            "hyperlink" => "hlink",
            "followedHyperlink" => "folHlink",
            other => other,
        }
    }

    /// Resolve a color to hex digits. `auto` has no fixed value.
    pub fn resolve_color(&self, color: &ColorValue) -> Option<String> {
        match color {
            ColorValue::Auto => None,
            ColorValue::Rgb(hex) => Some(hex.clone()),
            ColorValue::Theme {
                role,
                tint,
                shade,
                fallback,
            } => match self.colors.get(Self::role_for(role)) {
                Some(base) => Some(apply_tint_shade(base, *tint, *shade)),
                None => {
                    log::debug!("Unknown theme color {:?}", role);
                    fallback.clone()
                }
            },
        }
    }

    /// Resolve a theme font reference such as `minorHAnsi` or `majorEastAsia`.
    pub fn resolve_font(&self, reference: &str) -> Option<&str> {
        let (fonts, slot) = if let Some(rest) = reference.strip_prefix("major") {
            (&self.major, rest)
        } else if let Some(rest) = reference.strip_prefix("minor") {
            (&self.minor, rest)
        } else {
            return None;
        };
        let family = match slot {
            "EastAsia" => fonts.east_asia.as_deref(),
            "Bidi" => fonts.complex_script.as_deref(),
            _ => fonts.latin.as_deref(),
        };
        family.or(fonts.latin.as_deref())
    }
}

fn merge_fonts(parsed: ThemeFonts, fallback: ThemeFonts) -> ThemeFonts {
    ThemeFonts {
        latin: parsed.latin.or(fallback.latin),
        east_asia: parsed.east_asia.or(fallback.east_asia),
        complex_script: parsed.complex_script.or(fallback.complex_script),
    }
}

/// Tint moves each channel toward white, shade toward black; both are
/// fractions of 255.
fn apply_tint_shade(hex: &str, tint: Option<u8>, shade: Option<u8>) -> String {
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0) as u32;
    let mut rgb = [channel(0), channel(2), channel(4)];
    for c in rgb.iter_mut() {
        if let Some(t) = tint {
            let t = t as u32;
            *c = (*c * t + 255 * (255 - t) + 127) / 255;
        }
        if let Some(s) = shade {
            *c = (*c * s as u32 + 127) / 255;
        }
    }
    format!("{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}
