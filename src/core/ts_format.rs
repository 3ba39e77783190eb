//! Shared TS (gettext-subset) block parsing and rendering (spec §4.4, §4.5,
//! §6). Used by both `core::ts_ingest` and `core::ts_emit` so the
//! wrap/escape/continuation-joining logic is written once, per the design
//! note in spec §9.

use unicode_normalization::UnicodeNormalization;

use crate::core::normalize::content_hash;

/// Column width TS output is wrapped to (spec §4.5/§6).
pub const WRAP_WIDTH: usize = 76;

/// Unit separator joining plural variants in a stored translation string,
/// so a single `Translation.string` field can carry `msgstr[0..N]` without
/// a schema change; split back out on emission (spec §4.5).
pub const PLURAL_SEPARATOR: char = '\u{1F}';

/// `MD5(string ⟂ context)`: the disambiguation/reference key used both to
/// detect in-file string collisions (§4.3) and to validate `#: ID:` on
/// ingest (§4.4/§6). The separator is an implementation detail — any byte
/// that can't appear in `string` or `context` after NFC normalization and
/// control-character stripping would do; a NUL is chosen for visibility.
pub fn disambiguation_key(string: &str, context: &str) -> String {
    let mut joined = String::with_capacity(string.len() + context.len() + 1);
    joined.push_str(string);
    joined.push('\u{0}');
    joined.push_str(context);
    content_hash(&joined)
}

/// Strip `\x00`-`\x1F` control bytes except `\n`, then NFC-normalize.
/// Applied to every line of an ingested TS file before block splitting
/// (spec §4.4).
pub fn sanitize_line(line: &str) -> String {
    let stripped: String = line
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .collect();
    stripped.nfc().collect()
}

/// Escape `\`, `"`, and literal newlines for embedding in a quoted TS
/// string field (spec §4.5/§6). Order matters: backslashes first, so a
/// backslash introduced by escaping `"` or `\n` is never re-escaped.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

/// Inverse of [`escape`] (spec §4.4/§6: "Unescape `\"`, `\\`, `\n`").
pub fn unescape(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some('n') => out.push('\n'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Break `raw` into chunks, each boundary falling right after whitespace or
/// a hyphen, so concatenating the chunks recovers `raw` exactly (spec §4.5:
/// "wrapped... at whitespace or punctuation boundaries").
fn chunk_at_boundaries(raw: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut cur = String::new();
    for ch in raw.chars() {
        cur.push(ch);
        if ch == ' ' || ch == '\t' || ch == '-' {
            chunks.push(std::mem::take(&mut cur));
        }
    }
    if !cur.is_empty() {
        chunks.push(cur);
    }
    chunks
}

/// Split `raw` into one or more segments such that each segment, once
/// escaped and quoted, fits within `width` columns (spec §4.5/§6:
/// "wrap at 76 columns... multi-line begins with `\"\"`... each segment on
/// its own quoted line").
pub fn wrap(raw: &str, width: usize) -> Vec<String> {
    if raw.is_empty() {
        return vec![String::new()];
    }
    let chunks = chunk_at_boundaries(raw);
    let mut lines = Vec::new();
    let mut current = String::new();
    for chunk in chunks {
        let mut candidate = current.clone();
        candidate.push_str(&chunk);
        let quoted_len = escape(&candidate).len() + 2;
        if !current.is_empty() && quoted_len > width {
            lines.push(std::mem::take(&mut current));
            current = chunk;
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Render one `msgid`/`msgstr`/`msgctxt`/`msgid_plural`/`msgstr[N]` field,
/// wrapping into the teacher-independent multi-line gettext form when the
/// single-line rendering would exceed [`WRAP_WIDTH`].
pub fn render_field(name: &str, raw: &str) -> String {
    let single = format!("{name} \"{}\"", escape(raw));
    if single.len() <= WRAP_WIDTH || raw.is_empty() {
        return single;
    }
    let segments = wrap(raw, WRAP_WIDTH);
    if segments.len() <= 1 {
        return single;
    }
    let mut out = format!("{name} \"\"\n");
    for (i, seg) in segments.iter().enumerate() {
        out.push('"');
        out.push_str(&escape(seg));
        out.push('"');
        if i + 1 < segments.len() {
            out.push('\n');
        }
    }
    out
}

fn is_keyword_prefix(line: &str) -> bool {
    line.starts_with("msgctxt \"")
        || line.starts_with("msgid \"")
        || line.starts_with("msgid_plural \"")
        || line.starts_with("msgstr \"")
        || line.starts_with("msgstr[")
}

fn is_plain_quoted(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 2 && t.starts_with('"') && t.ends_with('"')
}

/// Extract the content between the first and last `"` on a keyword line,
/// along with everything before the opening quote (the field name, e.g.
/// `msgstr[1] `).
fn split_keyword_line(line: &str) -> Option<(&str, &str)> {
    let start = line.find('"')?;
    let end = line.rfind('"')?;
    if end <= start {
        return None;
    }
    Some((&line[..start], &line[start + 1..end]))
}

/// Join `"..."\n"..."` continuations onto the preceding keyword line so
/// each logical field becomes one string (spec §4.4: "Multi-line
/// continuations are joined before block splitting").
fn join_continuations(lines: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim_end().to_string();
        if is_keyword_prefix(&line) {
            let Some((prefix, mut content)) = split_keyword_line(&line).map(|(p, c)| (p.to_string(), c.to_string())) else {
                out.push(line);
                i += 1;
                continue;
            };
            let mut j = i + 1;
            while j < lines.len() && is_plain_quoted(&lines[j]) {
                let next = lines[j].trim();
                content.push_str(&next[1..next.len() - 1]);
                j += 1;
            }
            out.push(format!("{prefix}\"{content}\""));
            i = j;
        } else {
            out.push(line.trim_end().to_string());
            i += 1;
        }
    }
    out
}

/// One parsed TS block, before validation against the store (spec §4.4).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBlock {
    pub translator_comment: String,
    pub dev_comment: String,
    pub file_ref: Option<String>,
    pub id_key: Option<String>,
    pub flags: Vec<String>,
    pub msgctxt: String,
    pub msgid: String,
    pub msgid_plural: Option<String>,
    /// Index-ordered `msgstr`/`msgstr[N]` values; a bare `msgstr` occupies
    /// index 0.
    pub msgstr: Vec<String>,
}

impl ParsedBlock {
    pub fn is_empty_header_candidate(&self) -> bool {
        self.msgid.is_empty() && self.id_key.is_none()
    }
}

/// Split normalized TS text into blank-line-delimited blocks, each already
/// continuation-joined (spec §4.4).
pub fn split_into_blocks(text: &str) -> Vec<Vec<String>> {
    let sanitized: Vec<String> = text.lines().map(sanitize_line).collect();
    let joined = join_continuations(&sanitized);

    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in joined {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Parse one continuation-joined block's lines into a [`ParsedBlock`].
/// Unrecognized lines are ignored rather than rejected — a forward-
/// compatibility stance the teacher's own permissive parsers take.
pub fn parse_block(lines: &[String]) -> ParsedBlock {
    let mut block = ParsedBlock::default();
    let mut translator_lines = Vec::new();
    let mut dev_lines = Vec::new();
    let mut pending_split_id = false;

    for line in lines {
        let trimmed = line.as_str();
        if let Some(rest) = trimmed.strip_prefix("#: File:") {
            block.file_ref = Some(rest.trim().to_string());
            pending_split_id = false;
        } else if let Some(rest) = trimmed.strip_prefix("#: ID:") {
            let key = rest.trim();
            if key.is_empty() {
                // Poedit splits `#: ID:` and the key onto two lines.
                pending_split_id = true;
            } else {
                block.id_key = Some(key.to_string());
                pending_split_id = false;
            }
        } else if let Some(rest) = trimmed.strip_prefix("#:") {
            if pending_split_id {
                block.id_key = Some(rest.trim().to_string());
                pending_split_id = false;
            } else if block.file_ref.is_none() {
                block.file_ref = Some(rest.trim().to_string());
            }
        } else if let Some(rest) = trimmed.strip_prefix("#,") {
            for flag in rest.split(',') {
                let flag = flag.trim();
                if !flag.is_empty() {
                    block.flags.push(flag.to_string());
                }
            }
        } else if let Some(rest) = trimmed.strip_prefix("#.") {
            dev_lines.push(rest.trim().to_string());
        } else if let Some(rest) = trimmed.strip_prefix('#') {
            if !rest.starts_with(':') && !rest.starts_with(',') && !rest.starts_with('.') {
                translator_lines.push(rest.trim_start().to_string());
            }
        } else if trimmed.starts_with("msgctxt \"") {
            if let Some((_, content)) = split_keyword_line(trimmed) {
                block.msgctxt = unescape(content);
            }
        } else if trimmed.starts_with("msgid_plural \"") {
            if let Some((_, content)) = split_keyword_line(trimmed) {
                block.msgid_plural = Some(unescape(content));
            }
        } else if trimmed.starts_with("msgid \"") {
            if let Some((_, content)) = split_keyword_line(trimmed) {
                block.msgid = unescape(content);
            }
        } else if trimmed.starts_with("msgstr \"") {
            if let Some((_, content)) = split_keyword_line(trimmed) {
                set_msgstr(&mut block.msgstr, 0, unescape(content));
            }
        } else if trimmed.starts_with("msgstr[") {
            if let Some(idx_end) = trimmed.find(']') {
                if let Ok(idx) = trimmed[7..idx_end].parse::<usize>() {
                    if let Some((_, content)) = split_keyword_line(trimmed) {
                        set_msgstr(&mut block.msgstr, idx, unescape(content));
                    }
                }
            }
        }
    }

    block.translator_comment = translator_lines.join("\n");
    block.dev_comment = dev_lines.join("\n");
    block
}

fn set_msgstr(msgstr: &mut Vec<String>, index: usize, value: String) {
    if msgstr.len() <= index {
        msgstr.resize(index + 1, String::new());
    }
    msgstr[index] = value;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_order_prevents_double_escaping() {
        assert_eq!(escape("a\\b\"c\nd"), "a\\\\b\\\"c\\nd");
    }

    #[test]
    fn unescape_is_inverse_of_escape() {
        let raw = "line1\nline2 \"quoted\" \\ end";
        assert_eq!(unescape(&escape(raw)), raw);
    }

    #[test]
    fn wrap_recovers_original_when_concatenated() {
        let raw = "The quick brown fox jumps over the lazy dog and keeps running";
        let segments = wrap(raw, 20);
        assert_eq!(segments.concat(), raw);
        assert!(segments.len() > 1);
    }

    #[test]
    fn wrap_short_string_is_single_segment() {
        assert_eq!(wrap("hi", 76), vec!["hi".to_string()]);
    }

    #[test]
    fn render_field_short_is_single_line() {
        assert_eq!(render_field("msgid", "hi"), "msgid \"hi\"");
    }

    #[test]
    fn render_field_long_wraps_with_empty_first_line() {
        let long = "x".repeat(100);
        let rendered = render_field("msgid", &long);
        assert!(rendered.starts_with("msgid \"\"\n"));
    }

    #[test]
    fn disambiguation_key_is_stable_and_order_sensitive() {
        let a = disambiguation_key("Save", "toolbar");
        let b = disambiguation_key("Save", "menu");
        assert_ne!(a, b);
        assert_eq!(a, disambiguation_key("Save", "toolbar"));
    }

    #[test]
    fn split_into_blocks_joins_continuations_and_splits_on_blank_lines() {
        let text = "msgid \"\"\n\"hello \"\n\"world\"\nmsgstr \"\"\n\n#: ID: abc\nmsgid \"x\"\nmsgstr \"y\"\n";
        let blocks = split_into_blocks(text);
        assert_eq!(blocks.len(), 2);
        let first = parse_block(&blocks[0]);
        assert_eq!(first.msgid, "hello world");
    }

    #[test]
    fn parse_block_reads_all_fields_in_any_order() {
        let lines: Vec<String> = vec![
            "# a translator note".to_string(),
            "#. a dev note".to_string(),
            "#: File: src/a.txt".to_string(),
            "#: ID: deadbeef".to_string(),
            "#, fuzzy".to_string(),
            "msgctxt \"toolbar.save\"".to_string(),
            "msgid \"Save\"".to_string(),
            "msgstr \"Enregistrer\"".to_string(),
        ];
        let block = parse_block(&lines);
        assert_eq!(block.translator_comment, "a translator note");
        assert_eq!(block.dev_comment, "a dev note");
        assert_eq!(block.file_ref.as_deref(), Some("src/a.txt"));
        assert_eq!(block.id_key.as_deref(), Some("deadbeef"));
        assert_eq!(block.flags, vec!["fuzzy"]);
        assert_eq!(block.msgctxt, "toolbar.save");
        assert_eq!(block.msgid, "Save");
        assert_eq!(block.msgstr, vec!["Enregistrer".to_string()]);
    }

    #[test]
    fn parse_block_accepts_poedit_split_id_form() {
        let lines: Vec<String> = vec![
            "#: ID:".to_string(),
            "#: abc123".to_string(),
            "msgid \"x\"".to_string(),
        ];
        let block = parse_block(&lines);
        assert_eq!(block.id_key.as_deref(), Some("abc123"));
    }

    #[test]
    fn parse_block_reads_plural_msgstr_by_index() {
        let lines: Vec<String> = vec![
            "msgid \"cat\"".to_string(),
            "msgid_plural \"cats\"".to_string(),
            "msgstr[0] \"chat\"".to_string(),
            "msgstr[1] \"chats\"".to_string(),
        ];
        let block = parse_block(&lines);
        assert_eq!(block.msgid_plural.as_deref(), Some("cats"));
        assert_eq!(block.msgstr, vec!["chat".to_string(), "chats".to_string()]);
    }

    #[test]
    fn empty_header_candidate_detects_missing_msgid_and_key() {
        let block = ParsedBlock::default();
        assert!(block.is_empty_header_candidate());
        let with_key = ParsedBlock {
            id_key: Some("x".into()),
            ..Default::default()
        };
        assert!(!with_key.is_empty_header_candidate());
    }
}
