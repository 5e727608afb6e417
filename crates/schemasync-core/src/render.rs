//! Column and index clause rendering.

use crate::dialect::{ColumnType, Dialect};
use crate::schema::{Column, Index};

/// Resolves a column's SQL type, applying any nullability override.
pub fn resolve_type<D: Dialect + ?Sized>(dialect: &D, column: &Column) -> ColumnType {
    let mut column_type =
        dialect.column_type(&column.logical_type, column.size, column.auto_increment);
    if let Some(nullable) = column.nullable {
        column_type.nullable = nullable;
    }
    column_type
}

/// Renders a default literal. String-typed defaults are quoted, everything
/// else is emitted verbatim.
pub fn format_default<D: Dialect + ?Sized>(dialect: &D, column: &Column, value: &str) -> String {
    if column.logical_type.is_string() {
        dialect.quote_string(value)
    } else {
        value.to_string()
    }
}

/// Renders a column definition.
///
/// Token order is fixed: name, type, `NOT NULL`, `DEFAULT`, `PRIMARY KEY`,
/// auto-increment keyword, `UNIQUE`, `COMMENT`.
pub fn render_column<D: Dialect + ?Sized>(dialect: &D, column: &Column) -> String {
    let column_type = resolve_type(dialect, column);
    let mut parts = vec![dialect.quote(&column.name), column_type.sql_type];

    if !column_type.nullable {
        parts.push("NOT NULL".to_string());
    }

    if let Some(ref value) = column.default {
        parts.push("DEFAULT".to_string());
        parts.push(format_default(dialect, column, value));
    }

    if column.primary_key {
        parts.push("PRIMARY KEY".to_string());
    }

    let keyword = dialect.auto_increment();
    if column.auto_increment && !keyword.is_empty() {
        parts.push(keyword.to_string());
    }

    if column.unique {
        parts.push("UNIQUE".to_string());
    }

    if let Some(comment) = column.comment.as_deref().filter(|c| !c.is_empty()) {
        parts.push("COMMENT".to_string());
        parts.push(dialect.quote_string(comment));
    }

    parts.join(" ")
}

/// Renders an index as it appears in a create definition list.
pub fn render_index_definition<D: Dialect + ?Sized>(dialect: &D, index: &Index) -> String {
    let columns: Vec<String> = index.columns.iter().map(|c| dialect.quote(c)).collect();
    let columns = columns.join(", ");

    if index.is_primary() {
        return format!("PRIMARY KEY ({columns})");
    }

    let mut sql = String::new();
    if index.unique {
        sql.push_str("UNIQUE ");
    }
    sql.push_str("INDEX ");
    sql.push_str(&dialect.quote(&index.name));
    sql.push_str(&format!(" ({columns})"));
    sql
}
