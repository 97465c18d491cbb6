//! Column type equivalence.
//!
//! Both sides of a comparison are reduced to a canonical spelling and then
//! compared as strings, which keeps the relation symmetric.

use super::Dialect;

const INTEGER_FAMILIES: &[&str] = &["tinyint", "smallint", "mediumint", "int", "bigint"];

/// Non-integer base names whose values compare as numbers.
const NUMERIC_FAMILIES: &[&str] = &[
    "decimal", "numeric", "dec", "fixed", "float", "double", "real", "bool", "boolean",
];

/// Splits a normalized type into base name, parenthesized arguments and suffix.
fn split_type(sql_type: &str) -> (&str, Option<&str>, &str) {
    if let Some(open) = sql_type.find('(') {
        let close = sql_type[open..].find(')').map_or(sql_type.len(), |c| open + c);
        let args = &sql_type[open + 1..close.min(sql_type.len())];
        let suffix = sql_type.get(close + 1..).unwrap_or("").trim();
        return (sql_type[..open].trim(), Some(args), suffix);
    }
    if let Some(rest) = sql_type.strip_prefix("double precision") {
        return ("double precision", None, rest.trim());
    }
    sql_type
        .split_once(' ')
        .map_or((sql_type, None, ""), |(base, suffix)| (base, None, suffix.trim()))
}

fn lowercase_compact(sql_type: &str) -> String {
    let lower = sql_type.trim().to_ascii_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut pending_space = false;
    for c in lower.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space && !out.ends_with(['(', ',']) && !matches!(c, '(' | ')' | ',') {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

/// Returns the canonical spelling of `sql_type` for `dialect`.
#[must_use]
pub fn canonical_type(dialect: Dialect, sql_type: &str) -> String {
    let compact = lowercase_compact(sql_type);
    let (base, args, suffix) = split_type(&compact);

    let mut base = match base {
        "integer" => "int",
        other => other,
    };
    let mut args = args.map(str::to_string);

    if dialect == Dialect::MySql {
        base = match base {
            "bool" | "boolean" => {
                args = None;
                "tinyint"
            }
            "dec" | "numeric" | "fixed" => "decimal",
            "real" | "double precision" => "double",
            other => other,
        };
        match base {
            "decimal" => {
                args = Some(match args.as_deref() {
                    None | Some("") => "10,0".to_string(),
                    Some(p) if !p.contains(',') => format!("{p},0"),
                    Some(p) => p.to_string(),
                });
            }
            "bit" | "char" if args.is_none() => args = Some("1".to_string()),
            "year" if args.as_deref() == Some("4") => args = None,
            _ => {}
        }
    }

    if INTEGER_FAMILIES.contains(&base) {
        args = None;
    }

    let mut canonical = base.to_string();
    if let Some(args) = args {
        canonical.push('(');
        canonical.push_str(&args);
        canonical.push(')');
    }
    if !suffix.is_empty() {
        canonical.push(' ');
        canonical.push_str(suffix);
    }
    canonical
}

/// Returns whether two type spellings denote the same column type.
#[must_use]
pub fn types_equal(dialect: Dialect, a: &str, b: &str) -> bool {
    canonical_type(dialect, a) == canonical_type(dialect, b)
}

/// Returns whether the type belongs to one of the integer families.
#[must_use]
pub fn is_integer_type(dialect: Dialect, sql_type: &str) -> bool {
    let canonical = canonical_type(dialect, sql_type);
    let base = canonical.split(' ').next().unwrap_or_default();
    INTEGER_FAMILIES.contains(&base)
}

/// Returns whether values of the type compare as numbers.
#[must_use]
pub fn is_numeric_type(dialect: Dialect, sql_type: &str) -> bool {
    let canonical = canonical_type(dialect, sql_type);
    let base = canonical.split(['(', ' ']).next().unwrap_or_default();
    INTEGER_FAMILIES.contains(&base) || NUMERIC_FAMILIES.contains(&base)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOTH: [Dialect; 2] = [Dialect::MySql, Dialect::Sqlite];

    #[test]
    fn test_integer_spellings() {
        for dialect in BOTH {
            assert!(types_equal(dialect, "int", "integer"));
            assert!(types_equal(dialect, "int", "int(11)"));
            assert!(types_equal(dialect, "INTEGER", "int(11)"));
            assert!(types_equal(dialect, "bigint(20)", "BIGINT"));
            assert!(!types_equal(dialect, "tinyint(1)", "mediumint"));
            assert!(!types_equal(dialect, "int", "bigint"));
        }
    }

    #[test]
    fn test_equivalence_is_symmetric() {
        let samples = [
            "int", "integer", "int(11)", "tinyint(1)", "mediumint", "bool", "decimal",
            "decimal(10,0)", "decimal(10, 2)", "numeric(10,2)", "varchar(60)", "VARCHAR(60)",
            "double precision", "real", "bit", "bit(1)", "year(4)", "year", "char", "char(1)",
            "int unsigned", "int(10) unsigned", "text",
        ];
        for dialect in BOTH {
            for a in samples {
                for b in samples {
                    assert_eq!(
                        types_equal(dialect, a, b),
                        types_equal(dialect, b, a),
                        "{dialect:?}: {a} vs {b}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_mysql_aliases() {
        let d = Dialect::MySql;
        assert!(types_equal(d, "bool", "tinyint(1)"));
        assert!(types_equal(d, "boolean", "tinyint"));
        assert!(types_equal(d, "decimal", "decimal(10,0)"));
        assert!(types_equal(d, "numeric(8,2)", "decimal(8,2)"));
        assert!(types_equal(d, "decimal(8)", "decimal(8,0)"));
        assert!(types_equal(d, "double precision", "double"));
        assert!(types_equal(d, "real", "double"));
        assert!(types_equal(d, "bit", "bit(1)"));
        assert!(types_equal(d, "year(4)", "year"));
        assert!(types_equal(d, "char", "char(1)"));
        assert!(types_equal(d, "int unsigned", "int(10) unsigned"));
        assert!(!types_equal(d, "int unsigned", "int"));
        assert!(!types_equal(d, "varchar(60)", "varchar(50)"));
    }

    #[test]
    fn test_sqlite_keeps_mysql_aliases_distinct() {
        let d = Dialect::Sqlite;
        assert!(!types_equal(d, "bool", "tinyint"));
        assert!(types_equal(d, "varchar(60)", "VARCHAR(60)"));
        assert!(types_equal(d, "decimal(10, 2)", "decimal(10,2)"));
    }

    #[test]
    fn test_is_integer_type() {
        assert!(is_integer_type(Dialect::Sqlite, "integer"));
        assert!(is_integer_type(Dialect::MySql, "bigint(20) unsigned"));
        assert!(!is_integer_type(Dialect::MySql, "varchar(36)"));
    }

    #[test]
    fn test_is_numeric_type() {
        for dialect in BOTH {
            assert!(is_numeric_type(dialect, "decimal(10, 2)"));
            assert!(is_numeric_type(dialect, "double precision"));
            assert!(is_numeric_type(dialect, "int(11) unsigned"));
            assert!(is_numeric_type(dialect, "FLOAT"));
            assert!(!is_numeric_type(dialect, "varchar(10)"));
            assert!(!is_numeric_type(dialect, "text"));
            assert!(!is_numeric_type(dialect, "char(1)"));
        }
        assert!(is_numeric_type(Dialect::MySql, "bool"));
    }
}
