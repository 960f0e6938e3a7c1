//! Line scanner that maps top-level keys onto byte ranges of the source.
//!
//! The scanner does not parse values. It only finds where each top-level
//! entry starts and where its content ends, so that untouched entries can
//! be written back verbatim. Anything it does not understand makes it give
//! up and return `None`; the caller then falls back to re-rendering.

use std::ops::Range;

/// Byte ranges of one top-level entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntrySpan {
    /// Raw key token as written (quotes included).
    pub key: String,
    /// Key line through the last content line, newline included.
    pub body: Range<usize>,
    /// Blank lines and column-0 comments following the body.
    pub trailer: Range<usize>,
}

/// Partition of a document's source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Layout {
    pub preamble: Range<usize>,
    pub entries: Vec<EntrySpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind<'a> {
    Key(&'a str),
    Trivia,
    Indented,
    SequenceItem,
    DocumentStart,
    Directive,
    Other,
}

/// Scan `text` into a preamble and one span per top-level key.
pub(crate) fn scan(text: &str) -> Option<Layout> {
    let mut preamble_end = None;
    let mut entries: Vec<EntrySpan> = Vec::new();
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let start = offset;
        offset += line.len();

        match classify(line) {
            LineKind::Key(key) => {
                if preamble_end.is_none() {
                    preamble_end = Some(start);
                }
                if let Some(last) = entries.last_mut() {
                    last.trailer = last.body.end..start;
                }
                entries.push(EntrySpan {
                    key: key.to_string(),
                    body: start..offset,
                    trailer: offset..offset,
                });
            }
            LineKind::Trivia => {}
            LineKind::DocumentStart | LineKind::Directive => {
                if preamble_end.is_some() {
                    return None;
                }
            }
            LineKind::Indented | LineKind::SequenceItem => {
                let last = entries.last_mut()?;
                last.body.end = offset;
            }
            LineKind::Other => return None,
        }
    }

    if let Some(last) = entries.last_mut() {
        last.trailer = last.body.end..text.len();
    }

    Some(Layout {
        preamble: 0..preamble_end.unwrap_or(text.len()),
        entries,
    })
}

/// True if the line carries no content (blank, or a comment at column 0).
pub(crate) fn is_trivia(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with('#')
}

fn classify(line: &str) -> LineKind<'_> {
    if is_trivia(line) {
        return LineKind::Trivia;
    }
    if line.starts_with(' ') || line.starts_with('\t') {
        return LineKind::Indented;
    }
    if line.starts_with("---") {
        return LineKind::DocumentStart;
    }
    if line.starts_with('%') {
        return LineKind::Directive;
    }
    let trimmed = line.trim_end_matches(|c| c == '\n' || c == '\r');
    if trimmed == "-" || trimmed.starts_with("- ") || trimmed.starts_with("-\t") {
        return LineKind::SequenceItem;
    }
    match key_token(trimmed) {
        Some(key) => LineKind::Key(key),
        None => LineKind::Other,
    }
}

/// Extract the raw key of a `key: value` line starting at column 0.
fn key_token(line: &str) -> Option<&str> {
    let first = line.chars().next()?;
    if matches!(
        first,
        '?' | ':' | '{' | '[' | ']' | '}' | ',' | '|' | '>' | '@' | '`'
    ) || line.starts_with("...")
    {
        return None;
    }

    let end = match first {
        '"' => closing_double_quote(line)? + 1,
        '\'' => closing_single_quote(line)? + 1,
        _ => plain_key_end(line)?,
    };

    let rest = line[end..].trim_start_matches(|c| c == ' ' || c == '\t');
    let after = rest.strip_prefix(':')?;
    if !(after.is_empty() || after.starts_with(' ') || after.starts_with('\t')) {
        return None;
    }

    let key = line[..end].trim_end();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

fn plain_key_end(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    for (idx, byte) in bytes.iter().enumerate() {
        match byte {
            b'#' if idx > 0 && matches!(bytes[idx - 1], b' ' | b'\t') => return None,
            b':' if matches!(bytes.get(idx + 1), None | Some(b' ') | Some(b'\t')) => {
                return Some(idx)
            }
            _ => {}
        }
    }
    None
}

fn closing_double_quote(line: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, ch) in line.char_indices().skip(1) {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(idx),
            _ => {}
        }
    }
    None
}

fn closing_single_quote(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut idx = 1;
    while idx < bytes.len() {
        if bytes[idx] == b'\'' {
            if bytes.get(idx + 1) == Some(&b'\'') {
                idx += 2;
                continue;
            }
            return Some(idx);
        }
        idx += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(text: &str) -> Vec<String> {
        scan(text)
            .unwrap()
            .entries
            .into_iter()
            .map(|e| e.key)
            .collect()
    }

    #[test]
    fn test_key_token_plain_and_quoted() {
        assert_eq!(key_token("input: abc"), Some("input"));
        assert_eq!(key_token("input:"), Some("input"));
        assert_eq!(key_token("with space : 1"), Some("with space"));
        assert_eq!(key_token("\"a: b\": 1"), Some("\"a: b\""));
        assert_eq!(key_token("'it''s': 1"), Some("'it''s'"));
        assert_eq!(key_token("url: http://x"), Some("url"));
    }

    #[test]
    fn test_key_token_rejects_non_keys() {
        assert_eq!(key_token("http://x"), None);
        assert_eq!(key_token("plain text"), None);
        assert_eq!(key_token("{a: 1}"), None);
        assert_eq!(key_token("? complex"), None);
        assert_eq!(key_token("note #: 1"), None);
    }

    #[test]
    fn test_scan_partitions_source() {
        let text = "# header\ninput: abc  # inline\n\n# about output\noutput: |\n  line\n\n  more\n# trailing\n";
        let layout = scan(text).unwrap();

        assert_eq!(&text[layout.preamble.clone()], "# header\n");
        assert_eq!(layout.entries.len(), 2);

        let input = &layout.entries[0];
        assert_eq!(&text[input.body.clone()], "input: abc  # inline\n");
        assert_eq!(&text[input.trailer.clone()], "\n# about output\n");

        let output = &layout.entries[1];
        assert_eq!(&text[output.body.clone()], "output: |\n  line\n\n  more\n");
        assert_eq!(&text[output.trailer.clone()], "# trailing\n");
    }

    #[test]
    fn test_scan_block_sequence_at_column_zero() {
        let text = "words:\n- a\n- b\nnext: 1\n";
        let layout = scan(text).unwrap();
        assert_eq!(&text[layout.entries[0].body.clone()], "words:\n- a\n- b\n");
        assert_eq!(keys(text), vec!["words", "next"]);
    }

    #[test]
    fn test_scan_document_marker_in_preamble() {
        let text = "---\na: 1\n";
        let layout = scan(text).unwrap();
        assert_eq!(&text[layout.preamble], "---\n");
        assert_eq!(keys(text), vec!["a"]);
    }

    #[test]
    fn test_scan_gives_up_on_flow_mapping() {
        assert!(scan("{a: 1, b: 2}\n").is_none());
        assert!(scan("a: 1\n---\nb: 2\n").is_none());
    }

    #[test]
    fn test_scan_missing_final_newline() {
        let text = "a: 1\nb: 2";
        let layout = scan(text).unwrap();
        assert_eq!(&text[layout.entries[1].body.clone()], "b: 2");
        assert!(layout.entries[1].trailer.is_empty());
    }

    #[test]
    fn test_scan_empty_text() {
        let layout = scan("").unwrap();
        assert!(layout.entries.is_empty());
        assert_eq!(layout.preamble, 0..0);
    }
}
