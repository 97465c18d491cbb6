//! Quote-aware text scanning shared by the live-schema parsers.
//!
//! Everything here works on the small subset of DDL the generators emit.
//! Single-quoted literals accept doubled quotes (`''`) and, when
//! `backslash` is set, backslash escapes (MySQL). Backticked and
//! double-quoted identifiers are skipped over as opaque.

/// Marks every byte of `s` that lies outside quoted text.
///
/// Quote characters themselves are marked as inside.
fn outside_mask(s: &str, backslash: bool) -> Vec<bool> {
    let bytes = s.as_bytes();
    let mut mask = vec![true; bytes.len()];
    let mut i = 0;
    while i < bytes.len() {
        let quote = bytes[i];
        if !matches!(quote, b'\'' | b'`' | b'"') {
            i += 1;
            continue;
        }
        mask[i] = false;
        i += 1;
        while i < bytes.len() {
            mask[i] = false;
            if backslash && quote == b'\'' && bytes[i] == b'\\' {
                if i + 1 < bytes.len() {
                    mask[i + 1] = false;
                }
                i += 2;
                continue;
            }
            if bytes[i] == quote {
                if bytes.get(i + 1) == Some(&quote) {
                    mask[i + 1] = false;
                    i += 2;
                    continue;
                }
                i += 1;
                break;
            }
            i += 1;
        }
    }
    mask
}

const fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Collapses whitespace outside quoted text into single spaces and trims.
pub(crate) fn normalize_whitespace(s: &str, backslash: bool) -> String {
    let mask = outside_mask(s, backslash);
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for (i, c) in s.char_indices() {
        if mask[i] && c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    out
}

/// Removes double quotes around identifiers, leaving string literals intact.
pub(crate) fn strip_double_quotes(s: &str, backslash: bool) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_literal = false;
    let mut escaped = false;
    for c in s.chars() {
        if in_literal {
            out.push(c);
            if escaped {
                escaped = false;
            } else if backslash && c == '\\' {
                escaped = true;
            } else if c == '\'' {
                // A doubled quote is re-opened on the next iteration.
                in_literal = false;
            }
            continue;
        }
        match c {
            '\'' => {
                in_literal = true;
                out.push(c);
            }
            '"' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Finds `keyword` outside quoted text, case-insensitively and on word boundaries.
///
/// `keyword` may contain single spaces (`NOT NULL`); the input is expected
/// to be whitespace-normalized.
pub(crate) fn find_keyword(s: &str, keyword: &str, backslash: bool) -> Option<usize> {
    let mask = outside_mask(s, backslash);
    let bytes = s.as_bytes();
    let needle = keyword.as_bytes();
    if needle.is_empty() || needle.len() > bytes.len() {
        return None;
    }
    (0..=bytes.len() - needle.len()).find(|&i| {
        mask[i]
            && bytes[i..i + needle.len()].eq_ignore_ascii_case(needle)
            && (i == 0 || !is_word_byte(bytes[i - 1]))
            && bytes
                .get(i + needle.len())
                .map_or(true, |&b| !is_word_byte(b))
    })
}

/// Splits on commas that are outside quotes and parentheses.
pub(crate) fn split_top_level(s: &str, backslash: bool) -> Vec<&str> {
    let mask = outside_mask(s, backslash);
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, b) in s.bytes().enumerate() {
        if !mask[i] {
            continue;
        }
        match b {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = s[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

/// Returns the contents of the first top-level parenthesized group.
pub(crate) fn parenthesized(s: &str, backslash: bool) -> Option<&str> {
    let mask = outside_mask(s, backslash);
    let mut depth = 0usize;
    let mut open = None;
    for (i, b) in s.bytes().enumerate() {
        if !mask[i] {
            continue;
        }
        match b {
            b'(' => {
                if depth == 0 {
                    open = Some(i);
                }
                depth += 1;
            }
            b')' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return open.map(|o| &s[o + 1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Reads a single-quoted literal at the start of `s`.
///
/// Returns the unescaped value and the text after the closing quote, or
/// `None` when `s` does not start with a terminated literal.
pub(crate) fn read_quoted(s: &str, backslash: bool) -> Option<(String, &str)> {
    let rest = s.strip_prefix('\'')?;
    let mut value = String::new();
    let mut chars = rest.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if backslash => {
                let (_, escaped) = chars.next()?;
                value.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    '0' => '\0',
                    other => other,
                });
            }
            '\'' => {
                if matches!(chars.peek(), Some((_, '\''))) {
                    chars.next();
                    value.push('\'');
                } else {
                    return Some((value, &rest[i + 1..]));
                }
            }
            _ => value.push(c),
        }
    }
    None
}

/// Reads the value following `keyword` (optionally followed by `=`).
///
/// Quoted values are unescaped, bare values run to the next space or
/// comma, and `NULL` yields `None`, as does a missing keyword.
pub(crate) fn keyword_value(s: &str, keyword: &str, backslash: bool) -> Option<String> {
    let at = find_keyword(s, keyword, backslash)?;
    let rest = s[at + keyword.len()..].trim_start();
    let rest = rest.strip_prefix('=').map_or(rest, str::trim_start);
    if rest.starts_with('\'') {
        return read_quoted(rest, backslash).map(|(value, _)| value);
    }
    let end = rest
        .find(|c: char| c.is_whitespace() || c == ',')
        .unwrap_or(rest.len());
    let token = &rest[..end];
    if token.is_empty() || token.eq_ignore_ascii_case("NULL") {
        return None;
    }
    Some(token.to_string())
}

/// Strips backticks, double quotes or brackets around an identifier.
pub(crate) fn unquote_identifier(token: &str) -> &str {
    token.trim_matches(|c| matches!(c, '`' | '"' | '[' | ']'))
}

/// Returns the first whitespace-delimited token and the remainder.
pub(crate) fn first_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    s.split_once(char::is_whitespace)
        .map_or((s, ""), |(head, tail)| (head, tail.trim_start()))
}
