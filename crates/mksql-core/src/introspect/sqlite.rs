//! Parser for SQLite `sqlite_master` rows.

use std::collections::BTreeMap;

use crate::description::{ColumnDescription, TableDescription};
use crate::schema::{SchemaRegistry, Table, DEFAULT_PRIMARY_KEY_NAME};

use super::scan::{
    find_keyword, first_token, keyword_value, normalize_whitespace, parenthesized,
    split_top_level, strip_double_quotes, unquote_identifier,
};

/// Keywords that end the type part of a column definition.
const CONSTRAINT_KEYWORDS: &[&str] = &[
    "NOT",
    "NULL",
    "DEFAULT",
    "CONSTRAINT",
    "REFERENCES",
    "PRIMARY",
    "UNIQUE",
    "CHECK",
    "COLLATE",
    "AUTOINCREMENT",
    "GENERATED",
    "AS",
];

/// Keywords that start a table constraint rather than a column definition.
const TABLE_CONSTRAINTS: &[&str] = &["CONSTRAINT", "PRIMARY", "UNIQUE", "CHECK", "FOREIGN"];

/// One row of `SELECT type, name, sql FROM sqlite_master WHERE tbl_name = ?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterRow {
    /// Object type (`table`, `index`, ...).
    pub kind: String,
    /// Object name.
    pub name: String,
    /// Creating statement; `NULL` for automatic indexes.
    pub sql: Option<String>,
}

impl MasterRow {
    /// Builds a row from its three columns.
    pub fn new(kind: &str, name: &str, sql: Option<&str>) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            sql: sql.map(str::to_string),
        }
    }
}

/// Describes `table` from its `sqlite_master` rows.
///
/// Foreign keys written without a referenced column resolve to the target
/// table's registered primary key, or `id` when the target is unknown.
#[must_use]
pub fn parse_sqlite_master(
    rows: &[MasterRow],
    table: &Table,
    registry: &SchemaRegistry,
) -> TableDescription {
    let Some(create_sql) = rows
        .iter()
        .find(|row| row.kind.eq_ignore_ascii_case("table"))
        .and_then(|row| row.sql.as_deref())
    else {
        return TableDescription::absent();
    };

    let sql = normalize_whitespace(&strip_double_quotes(create_sql, false), false);
    let body = parenthesized(&sql, false).unwrap_or_default();

    let mut description = TableDescription {
        table_exists: true,
        ..TableDescription::default()
    };
    let mut definitions: BTreeMap<String, &str> = BTreeMap::new();

    for part in split_top_level(body, false) {
        let (head, rest) = first_token(part);
        let is_table_constraint = TABLE_CONSTRAINTS
            .iter()
            .any(|kw| head.eq_ignore_ascii_case(kw));
        if find_keyword(part, "PRIMARY KEY", false).is_some() {
            description.primary_key_name = if is_table_constraint {
                parenthesized(part, false).map(|cols| unquote_identifier(cols.trim()).to_string())
            } else {
                Some(unquote_identifier(head).to_string())
            };
        }
        if !is_table_constraint {
            definitions.insert(unquote_identifier(head).to_string(), rest);
        }
    }

    let unique_indexes = unique_indexes(rows);

    for column in table.columns() {
        let found = definitions.get(column.name()).map_or_else(ColumnDescription::absent, |rest| {
            let mut found = parse_column_definition(rest, registry);
            found.unique_index = unique_indexes.get(column.name()).cloned();
            found
        });
        description.columns.insert(column.name().to_string(), found);
    }
    description
}

fn parse_column_definition(rest: &str, registry: &SchemaRegistry) -> ColumnDescription {
    let type_words: Vec<&str> = rest
        .split(' ')
        .take_while(|word| {
            !CONSTRAINT_KEYWORDS
                .iter()
                .any(|kw| word.eq_ignore_ascii_case(kw))
        })
        .collect();
    ColumnDescription {
        column_exists: true,
        sql_type: type_words.join(" ").to_ascii_lowercase(),
        not_null: find_keyword(rest, "NOT NULL", false).is_some(),
        default: keyword_value(rest, "DEFAULT", false),
        comment: None,
        unique_index: None,
        foreign_keys: foreign_keys(rest, registry),
    }
}

/// Collects `CONSTRAINT name REFERENCES table[(column)]` clauses.
fn foreign_keys(definition: &str, registry: &SchemaRegistry) -> BTreeMap<String, String> {
    let mut found = BTreeMap::new();
    let mut cursor = definition;
    while let Some(at) = find_keyword(cursor, "CONSTRAINT", false) {
        let (name, tail) = first_token(&cursor[at + "CONSTRAINT".len()..]);
        cursor = tail;
        let Some(references) = strip_keyword(tail, "REFERENCES") else {
            continue;
        };
        let target_end = references
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '`' | '"')))
            .unwrap_or(references.len());
        let target = unquote_identifier(&references[..target_end]);
        let after_target = references[target_end..].trim_start();
        let target_column = if after_target.starts_with('(') {
            parenthesized(after_target, false).map(|c| unquote_identifier(c.trim()).to_string())
        } else {
            None
        };
        let target_column = target_column.unwrap_or_else(|| {
            registry
                .primary_key_of(target)
                .unwrap_or(DEFAULT_PRIMARY_KEY_NAME)
                .to_string()
        });
        found.insert(
            format!("{target}.{target_column}"),
            unquote_identifier(name).to_string(),
        );
        cursor = after_target;
    }
    found
}

fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let head = s.get(..keyword.len())?;
    if head.eq_ignore_ascii_case(keyword) {
        Some(s[keyword.len()..].trim_start())
    } else {
        None
    }
}

/// Maps column name to index name for single-column `CREATE UNIQUE INDEX` rows.
fn unique_indexes(rows: &[MasterRow]) -> BTreeMap<String, String> {
    let mut indexes = BTreeMap::new();
    for row in rows.iter().filter(|row| row.kind.eq_ignore_ascii_case("index")) {
        let Some(sql) = row.sql.as_deref() else {
            continue;
        };
        let sql = normalize_whitespace(&strip_double_quotes(sql, false), false);
        let Some(rest) = strip_keyword(&sql, "CREATE UNIQUE INDEX") else {
            continue;
        };
        let (name, _) = first_token(rest);
        let Some(on_at) = find_keyword(rest, "ON", false) else {
            continue;
        };
        let Some(cols) = parenthesized(&rest[on_at..], false) else {
            continue;
        };
        if !cols.contains(',') {
            indexes
                .entry(unquote_identifier(cols.trim()).to_string())
                .or_insert_with(|| unquote_identifier(name).to_string());
        }
    }
    indexes
}
