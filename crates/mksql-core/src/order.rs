//! Dependency ordering of registered tables.

use std::collections::HashMap;

use crate::error::{Result, SchemaError};
use crate::schema::SchemaRegistry;

/// Recursion limit of the depth-first walk. Only a foreign-key cycle gets here.
pub const MAX_DEPENDENCY_DEPTH: usize = 64;

/// Returns table names so that every table comes after the tables its
/// foreign keys reference.
///
/// Tables are visited in registration order and each appears exactly once.
/// Self references and references to unregistered tables are ignored.
///
/// # Errors
///
/// Returns [`SchemaError::DependencyDepthExceeded`] on a foreign-key cycle.
pub fn dependency_order(registry: &SchemaRegistry) -> Result<Vec<String>> {
    let mut dependencies: HashMap<&str, Vec<&str>> = HashMap::new();
    for table in registry.tables() {
        let deps = dependencies.entry(table.name()).or_default();
        for column in table.columns() {
            for fk in column.foreign_keys() {
                let target = fk.table.as_str();
                if target != table.name()
                    && registry.table(target).is_some()
                    && !deps.contains(&target)
                {
                    deps.push(target);
                }
            }
        }
    }

    let mut ordered = Vec::with_capacity(registry.len());
    for table in registry.tables() {
        visit(table.name(), &dependencies, &mut ordered, 0)?;
    }
    Ok(ordered)
}

fn visit(
    table: &str,
    dependencies: &HashMap<&str, Vec<&str>>,
    ordered: &mut Vec<String>,
    depth: usize,
) -> Result<()> {
    if ordered.iter().any(|t| t == table) {
        return Ok(());
    }
    if depth > MAX_DEPENDENCY_DEPTH {
        return Err(SchemaError::DependencyDepthExceeded {
            table: table.to_string(),
            depth: MAX_DEPENDENCY_DEPTH,
        });
    }
    if let Some(deps) = dependencies.get(table) {
        for dep in deps {
            visit(dep, dependencies, ordered, depth + 1)?;
        }
    }
    ordered.push(table.to_string());
    Ok(())
}
