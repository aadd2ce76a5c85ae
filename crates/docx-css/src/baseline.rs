//! Fixed stylesheet returned when synthesis fails.

/// Plain typography for converted Word documents. Contains no document
/// specific class, so it is safe to serve with any reconstructed tree.
pub const BASELINE_CSS: &str = r#"body { font-family: serif; line-height: 1.6; margin: 1em; }
p { margin: 0.3em 0; }
h1 { font-size: 1.8em; margin: 1em 0 0.5em; }
h2 { font-size: 1.4em; margin: 0.8em 0 0.4em; }
h3 { font-size: 1.2em; margin: 0.6em 0 0.3em; }
h4, h5, h6 { font-size: 1.1em; margin: 0.5em 0 0.3em; }
table { border-collapse: collapse; margin: 0.5em 0; width: 100%; }
td, th { border: 1px solid #ccc; padding: 0.3em 0.5em; }
ul, ol { margin: 0.5em 0; padding-left: 2em; }
nav.toc ol { list-style: none; padding-left: 0; }
nav.toc li { display: flex; }
nav.toc li .leader { flex: 1; border-bottom: 1px dotted; margin: 0 0.3em 0.3em; }
"#;
