//! Style, numbering, theme and settings parts of a Word document, parsed
//! into owned tables that later stages query by id.
//!
//! Every `from_xml` constructor is lenient: malformed nodes are skipped and
//! recorded in the caller's [`Diagnostics`](docx_core::error::Diagnostics).

pub mod level_text;
pub mod numbering;
pub mod props;
pub mod settings;
pub mod styles;
pub mod theme;

pub use numbering::{EffectiveLevel, NumberFormat, NumberingTable};
pub use settings::DocumentSettings;
pub use styles::{EffectiveStyle, StyleKind, StyleTable};
pub use theme::ThemeInfo;
