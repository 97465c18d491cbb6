//! Whitelist validation for everything that is concatenated into SQL.
//!
//! The generators build DDL by string concatenation, so these checks are the
//! only barrier between caller input and the database. Comments and default
//! values are additionally screened for keywords that the live-schema readers
//! use to find field boundaries when they re-parse the generated DDL.

use sha2::{Digest, Sha256};

use crate::error::{Result, SchemaError};

/// Keywords that must never appear inside comments or default values.
const RESERVED_FRAGMENTS: &[&str] = &[
    "NOT NULL",
    "DEFAULT",
    "CREATE TABLE",
    "CONSTRAINT",
    "REFERENCES",
    "CREATE UNIQUE INDEX",
    "PRIMARY KEY",
];

/// Number of hex digits of the SHA-256 digest kept in shortened key names.
const KEY_HASH_LEN: usize = 16;

/// Shortest name `shorten_key_name` produces; smaller limits are raised to it.
const MIN_KEY_LEN: usize = 2;

/// Leading letter of names that consist of the digest alone.
const HASH_ONLY_PREFIX: char = 'k';

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Validates a table, column, index or constraint name.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidIdentifier`] if the name is empty or contains
/// anything outside `[A-Za-z0-9_]`.
pub fn validate_identifier(name: &str) -> Result<&str> {
    if name.is_empty() || !name.chars().all(is_identifier_char) {
        return Err(SchemaError::InvalidIdentifier(name.to_string()));
    }
    Ok(name)
}

/// Validates a column type and returns its normalized form.
///
/// Allowed characters are the identifier set plus `(`, `)`, `,` and spaces.
/// Runs of spaces collapse to one and spaces next to parentheses or commas
/// are removed, so `decimal(10, 2)` becomes `decimal(10,2)`.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidType`] on forbidden characters or an empty type.
pub fn validate_type(sql_type: &str) -> Result<String> {
    let valid = sql_type
        .chars()
        .all(|c| is_identifier_char(c) || matches!(c, '(' | ')' | ',' | ' '));
    if !valid || sql_type.trim().is_empty() {
        return Err(SchemaError::InvalidType(sql_type.to_string()));
    }

    let mut normalized = String::with_capacity(sql_type.len());
    let mut pending_space = false;
    for c in sql_type.trim().chars() {
        if c == ' ' {
            pending_space = true;
            continue;
        }
        if pending_space {
            let prev_is_punct = normalized.ends_with(['(', ')', ',']);
            if !prev_is_punct && !matches!(c, '(' | ')' | ',') {
                normalized.push(' ');
            }
            pending_space = false;
        }
        normalized.push(c);
    }
    Ok(normalized)
}

fn reserved_fragment(text: &str) -> Option<&'static str> {
    let upper = text.to_ascii_uppercase();
    RESERVED_FRAGMENTS
        .iter()
        .copied()
        .find(|fragment| upper.contains(fragment))
}

/// Validates a column or table comment. Empty comments are treated as absent.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidComment`] if the text contains a reserved
/// keyword such as `NOT NULL` or `DEFAULT` (case-insensitive).
pub fn validate_comment(text: Option<&str>) -> Result<Option<String>> {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if let Some(keyword) = reserved_fragment(text) {
        return Err(SchemaError::InvalidComment {
            text: text.to_string(),
            keyword,
        });
    }
    Ok(Some(text.to_string()))
}

/// Validates the textual form of a default value.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidDefault`] if the text contains a reserved keyword.
pub fn validate_default(text: &str) -> Result<&str> {
    if let Some(keyword) = reserved_fragment(text) {
        return Err(SchemaError::InvalidDefault {
            text: text.to_string(),
            keyword,
        });
    }
    Ok(text)
}

/// Validates a `table.column` foreign-key target and returns both halves.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidForeignKeyTarget`] unless the string holds
/// exactly one `.` with a valid identifier on each side.
pub fn validate_foreign_key_target(target: &str) -> Result<(&str, &str)> {
    let invalid = || SchemaError::InvalidForeignKeyTarget(target.to_string());
    let (table, column) = target.split_once('.').ok_or_else(invalid)?;
    if column.contains('.') {
        return Err(invalid());
    }
    validate_identifier(table).map_err(|_| invalid())?;
    validate_identifier(column).map_err(|_| invalid())?;
    Ok((table, column))
}

/// Fits a generated constraint or index name into `max_len` characters.
///
/// Names that already fit are validated and returned unchanged. Longer names
/// are truncated and suffixed with part of their SHA-256 digest, so the same
/// input always yields the same output across runs. When the limit leaves
/// no room for a readable prefix, the name is `k` followed by digest digits.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidIdentifier`] if `name` is not a valid identifier.
pub fn shorten_key_name(name: &str, max_len: usize) -> Result<String> {
    validate_identifier(name)?;
    if name.len() <= max_len {
        return Ok(name.to_string());
    }

    let digest = format!("{:x}", Sha256::digest(name.as_bytes()));
    let hash = &digest[..KEY_HASH_LEN];
    // Hash-only names start with a letter so they stay usable unquoted.
    if max_len <= KEY_HASH_LEN + 1 {
        let room = max_len.max(MIN_KEY_LEN) - 1;
        return Ok(format!("{HASH_ONLY_PREFIX}{}", &digest[..room]));
    }

    // Identifiers are ASCII, so byte slicing is safe.
    let prefix_len = max_len - KEY_HASH_LEN - 1;
    let prefix = name[..prefix_len].trim_end_matches('_');
    if prefix.is_empty() {
        return Ok(format!("{HASH_ONLY_PREFIX}{hash}"));
    }
    Ok(format!("{prefix}_{hash}"))
}
