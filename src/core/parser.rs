//! The `Parser` capability (spec §6).
//!
//! The concrete file-format parsers (XML, Android, PHP/XHTML, etc.) are an
//! external collaborator per spec §1 — out of scope for this crate. Only
//! the capability trait is defined here, plus a single line-based fixture
//! parser (`fixture::LineParser`) used to drive this crate's own tests and,
//! behind the CLI's `--demo-parser` flag, a runnable end-to-end demo.
//!
//! Modeled as a tagged union of the two call modes, per the design note in
//! spec §9, rather than one method whose callback shape depends on whether
//! a language argument was passed.

use anyhow::Result;

/// One translatable string as handed to the extraction or rendering
/// callback. Mirrors the five extraction-time fields in spec §4.3 plus the
/// `lang`/`source_key` fields from the callback signature in spec §6.
#[derive(Debug, Clone, Default)]
pub struct ExtractedString {
    pub string: String,
    pub context: String,
    pub hint: String,
    /// Free-form flags attached by the parser, e.g. `dont-normalize`,
    /// `normalize`, or a `pad:<n>` pair (spec §4.3, §4.6).
    pub flags: Vec<String>,
    /// An editor/tool-specific key used to disambiguate collisions before
    /// falling back to `hint` (spec §4.3 step 4(i)).
    pub source_key: String,
    /// Non-empty for plural-capable strings: the plural form of `string`.
    pub plural: Option<String>,
}

/// What the extraction callback decided to do with a string. Extraction
/// mode's return value is otherwise unused (spec §6), but the engine still
/// needs to know whether a hook vetoed the string before the parser moves
/// on, so the trait threads a result back rather than using `()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractAction {
    Keep,
    Drop,
}

/// Capability a source-file parser provides to the engine.
///
/// Extraction mode walks a buffer and calls `on_string` once per
/// translatable string; rendering mode does the same walk but splices the
/// callback's returned translation back into the output buffer.
pub trait Parser: Send + Sync {
    /// Human-readable name used in job-fingerprint computation, so a parser
    /// upgrade can be made to invalidate cached optimizations (spec §4.1).
    fn name(&self) -> &str;

    /// Parser version, likewise folded into the job fingerprint.
    fn version(&self) -> &str;

    /// Extraction mode: `lang` absent, callback return value unused beyond
    /// [`ExtractAction`] (spec §6).
    fn extract(
        &self,
        buffer: &str,
        on_string: &mut dyn FnMut(&ExtractedString) -> ExtractAction,
    ) -> Result<()>;

    /// Rendering mode: `lang` present, callback returns the translated
    /// string which the parser splices back into the rendered buffer
    /// (spec §4.6, §6).
    fn render(
        &self,
        buffer: &str,
        lang: &str,
        on_string: &mut dyn FnMut(&ExtractedString) -> String,
    ) -> Result<String>;
}

pub mod fixture {
    //! A minimal line-based `Parser` used by this crate's own tests and by
    //! the CLI's `--demo-parser` flag. One non-blank line is one
    //! translatable string; this is deliberately too simple to count as a
    //! "concrete file-format parser" in the sense spec §1 excludes.

    use super::*;

    pub struct LineParser;

    impl Parser for LineParser {
        fn name(&self) -> &str {
            "line-fixture"
        }

        fn version(&self) -> &str {
            "1"
        }

        fn extract(
            &self,
            buffer: &str,
            on_string: &mut dyn FnMut(&ExtractedString) -> ExtractAction,
        ) -> Result<()> {
            for line in buffer.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                let extracted = ExtractedString {
                    string: line.to_string(),
                    ..Default::default()
                };
                on_string(&extracted);
            }
            Ok(())
        }

        fn render(
            &self,
            buffer: &str,
            _lang: &str,
            on_string: &mut dyn FnMut(&ExtractedString) -> String,
        ) -> Result<String> {
            let mut out = String::new();
            for line in buffer.lines() {
                if line.trim().is_empty() {
                    out.push('\n');
                    continue;
                }
                let extracted = ExtractedString {
                    string: line.to_string(),
                    ..Default::default()
                };
                out.push_str(&on_string(&extracted));
                out.push('\n');
            }
            Ok(out)
        }
    }

    #[test]
    fn line_parser_extracts_nonblank_lines() {
        let parser = LineParser;
        let mut seen = Vec::new();
        parser
            .extract("Hello\n\nWorld\n", &mut |s| {
                seen.push(s.string.clone());
                ExtractAction::Keep
            })
            .unwrap();
        assert_eq!(seen, vec!["Hello", "World"]);
    }

    #[test]
    fn line_parser_renders_translation() {
        let parser = LineParser;
        let out = parser
            .render("Hello\nWorld\n", "fr", &mut |s| match s.string.as_str() {
                "Hello" => "Bonjour".to_string(),
                other => other.to_string(),
            })
            .unwrap();
        assert_eq!(out, "Bonjour\nWorld\n");
    }
}
