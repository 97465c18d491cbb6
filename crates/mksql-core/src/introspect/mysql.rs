//! Parser for MySQL `SHOW CREATE TABLE` output.

use std::collections::BTreeMap;

use crate::description::{ColumnDescription, TableDescription};
use crate::schema::Table;

use super::scan::{
    find_keyword, first_token, keyword_value, normalize_whitespace, parenthesized,
    unquote_identifier,
};

/// Keywords that end the type part of a column definition line.
const ATTRIBUTE_KEYWORDS: &[&str] = &[
    "NOT",
    "NULL",
    "DEFAULT",
    "COMMENT",
    "AUTO_INCREMENT",
    "CHARACTER",
    "COLLATE",
    "GENERATED",
    "ON",
    "INVISIBLE",
    "VISIBLE",
];

/// Describes `table` from the text of `SHOW CREATE TABLE`.
///
/// Every desired column gets an entry; columns without a definition line
/// are reported with `column_exists = false`.
#[must_use]
pub fn parse_show_create_table(create_sql: &str, table: &Table) -> TableDescription {
    let mut column_lines: BTreeMap<String, String> = BTreeMap::new();
    let mut unique_indexes: BTreeMap<String, String> = BTreeMap::new();
    let mut foreign_keys: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    let mut description = TableDescription {
        table_exists: true,
        ..TableDescription::default()
    };

    for raw in create_sql.lines() {
        let line = normalize_whitespace(raw, true);
        let line = line.trim_end_matches(',');
        let upper = line.to_ascii_uppercase();

        if upper.starts_with("CREATE TABLE") {
            continue;
        } else if upper.starts_with("PRIMARY KEY") {
            description.primary_key_name =
                parenthesized(line, true).map(|cols| unquote_identifier(cols.trim()).to_string());
        } else if upper.starts_with("UNIQUE KEY") || upper.starts_with("UNIQUE INDEX") {
            let (_, rest) = first_token(&line["UNIQUE".len()..]);
            let (name, _) = first_token(rest);
            if let Some(column) = single_column(line) {
                unique_indexes
                    .entry(column)
                    .or_insert_with(|| unquote_identifier(name).to_string());
            }
        } else if upper.starts_with("CONSTRAINT") {
            if let Some((column, target, name)) = parse_foreign_key_line(line) {
                foreign_keys.entry(column).or_default().insert(target, name);
            }
        } else if line.starts_with(')') {
            description.comment = keyword_value(line, "COMMENT", true);
        } else if !upper.starts_with("KEY ") && !upper.starts_with("FULLTEXT") {
            let (name, rest) = first_token(line);
            column_lines.insert(unquote_identifier(name).to_string(), rest.to_string());
        }
    }

    for column in table.columns() {
        let mut found = column_lines
            .get(column.name())
            .map_or_else(ColumnDescription::absent, |rest| parse_column_definition(rest));
        if found.column_exists {
            found.unique_index = unique_indexes.remove(column.name());
            found.foreign_keys = foreign_keys.remove(column.name()).unwrap_or_default();
        }
        description.columns.insert(column.name().to_string(), found);
    }
    description
}

fn parse_column_definition(rest: &str) -> ColumnDescription {
    let type_words: Vec<&str> = rest
        .split(' ')
        .take_while(|word| {
            !ATTRIBUTE_KEYWORDS
                .iter()
                .any(|kw| word.eq_ignore_ascii_case(kw))
        })
        .collect();
    ColumnDescription {
        column_exists: true,
        sql_type: type_words.join(" ").to_ascii_lowercase(),
        not_null: find_keyword(rest, "NOT NULL", true).is_some(),
        default: keyword_value(rest, "DEFAULT", true),
        comment: keyword_value(rest, "COMMENT", true),
        ..ColumnDescription::default()
    }
}

/// Returns the column of an index line ending in a single-column list.
fn single_column(line: &str) -> Option<String> {
    let open = line.rfind('(')?;
    let cols = parenthesized(&line[open..], true)?;
    if cols.contains(',') {
        return None;
    }
    Some(unquote_identifier(cols.trim()).to_string())
}

/// Parses `CONSTRAINT name FOREIGN KEY (col) REFERENCES target (tcol)`.
///
/// Returns the local column, the `target.tcol` key and the constraint name.
fn parse_foreign_key_line(line: &str) -> Option<(String, String, String)> {
    let (_, rest) = first_token(line);
    let (name, _) = first_token(rest);
    let fk_at = find_keyword(line, "FOREIGN KEY", true)?;
    let column = parenthesized(&line[fk_at..], true)?;
    let ref_at = find_keyword(line, "REFERENCES", true)?;
    let references = line[ref_at + "REFERENCES".len()..].trim_start();
    let target_end = references.find(['(', ' ']).unwrap_or(references.len());
    let target = unquote_identifier(&references[..target_end]);
    let target_column = parenthesized(references, true)?;
    if column.contains(',') || target_column.contains(',') {
        return None;
    }
    Some((
        unquote_identifier(column.trim()).to_string(),
        format!("{target}.{}", unquote_identifier(target_column.trim())),
        unquote_identifier(name).to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSIONS: &str = "CREATE TABLE `sessions` (
  `id` int NOT NULL AUTO_INCREMENT,
  `token` varchar(64) NOT NULL COMMENT 'opaque, it''s random',
  `account` int DEFAULT NULL,
  `role` varchar(20) DEFAULT 'it\\'s' COMMENT 'role DEFAULT-free',
  `score` decimal(10,2) NOT NULL DEFAULT '0.00',
  `note` text,
  PRIMARY KEY (`id`),
  UNIQUE KEY `sessions_token_mksql_uindex` (`token`),
  KEY `sessions_accounts_account_id_mksql_fk` (`account`),
  CONSTRAINT `sessions_accounts_account_id_mksql_fk` FOREIGN KEY (`account`) REFERENCES `accounts` (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_0900_ai_ci COMMENT='login sessions'";

    fn sessions_table() -> Table {
        let mut table = Table::new("sessions").unwrap();
        for (name, ty) in [
            ("token", "varchar(64)"),
            ("account", "int"),
            ("role", "varchar(20)"),
            ("score", "decimal(10,2)"),
            ("note", "text"),
            ("missing", "int"),
        ] {
            table.create_column(name, ty).unwrap();
        }
        table
    }

    #[test]
    fn test_table_level_attributes() {
        let desc = parse_show_create_table(SESSIONS, &sessions_table());
        assert!(desc.table_exists);
        assert_eq!(desc.primary_key_name.as_deref(), Some("id"));
        assert_eq!(desc.comment.as_deref(), Some("login sessions"));
    }

    #[test]
    fn test_column_attributes() {
        let desc = parse_show_create_table(SESSIONS, &sessions_table());

        let token = desc.column("token").unwrap();
        assert_eq!(token.sql_type, "varchar(64)");
        assert!(token.not_null);
        assert_eq!(token.default, None);
        assert_eq!(token.comment.as_deref(), Some("opaque, it's random"));
        assert_eq!(
            token.unique_index.as_deref(),
            Some("sessions_token_mksql_uindex")
        );

        let role = desc.column("role").unwrap();
        assert!(!role.not_null);
        assert_eq!(role.default.as_deref(), Some("it's"));
        assert_eq!(role.comment.as_deref(), Some("role DEFAULT-free"));

        let score = desc.column("score").unwrap();
        assert_eq!(score.sql_type, "decimal(10,2)");
        assert_eq!(score.default.as_deref(), Some("0.00"));

        let note = desc.column("note").unwrap();
        assert_eq!(note.sql_type, "text");
        assert_eq!(note.default, None);
        assert_eq!(note.unique_index, None);

        assert!(!desc.has_column("missing"));
    }

    #[test]
    fn test_foreign_keys() {
        let desc = parse_show_create_table(SESSIONS, &sessions_table());
        let account = desc.column("account").unwrap();
        assert_eq!(account.default, None);
        assert_eq!(
            account.foreign_keys.get("accounts.id").map(String::as_str),
            Some("sessions_accounts_account_id_mksql_fk")
        );
        assert!(account.unique_index.is_none());
    }

    #[test]
    fn test_legacy_display_widths() {
        let sql = "CREATE TABLE `t` (
  `id` int(11) NOT NULL AUTO_INCREMENT,
  `flag` tinyint(1) NOT NULL DEFAULT '0',
  `n` int(10) unsigned DEFAULT NULL,
  PRIMARY KEY (`id`)
) ENGINE=InnoDB";
        let mut table = Table::new("t").unwrap();
        table.create_column("flag", "tinyint(1)").unwrap();
        table.create_column("n", "int unsigned").unwrap();
        let desc = parse_show_create_table(sql, &table);
        assert_eq!(desc.column("flag").unwrap().sql_type, "tinyint(1)");
        assert_eq!(desc.column("flag").unwrap().default.as_deref(), Some("0"));
        assert_eq!(desc.column("n").unwrap().sql_type, "int(10) unsigned");
        assert_eq!(desc.comment, None);
    }
}
