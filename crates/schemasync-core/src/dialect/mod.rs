//! SQL dialects.
//!
//! A dialect maps logical column types to the engine's SQL types and knows
//! how to quote identifiers and string literals. Dialects are stateless and
//! can be shared across threads and concurrent diffs.

mod mysql;

pub use mysql::MySqlDialect;

use crate::schema::LogicalType;

/// SQL type chosen for a logical type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    /// SQL type name, e.g. `VARCHAR(50)`.
    pub sql_type: String,
    /// Whether the logical type is nullable on its own.
    pub nullable: bool,
}

impl ColumnType {
    /// Creates a column type.
    #[must_use]
    pub fn new(sql_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            sql_type: sql_type.into(),
            nullable,
        }
    }
}

/// Trait for engine-specific type mapping and quoting.
pub trait Dialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Maps a logical type to the SQL type. Never fails: unknown types map
    /// to a nullable wide character type.
    fn column_type(
        &self,
        logical_type: &LogicalType,
        size: u64,
        auto_increment: bool,
    ) -> ColumnType;

    /// Returns the identifier quote character.
    fn quote_char(&self) -> char {
        '"'
    }

    /// Quotes an identifier, doubling any embedded quote character.
    fn quote(&self, identifier: &str) -> String {
        let q = self.quote_char();
        let escaped = identifier.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Quotes a string literal, doubling embedded single quotes.
    fn quote_string(&self, literal: &str) -> String {
        format!("'{}'", literal.replace('\'', "''"))
    }

    /// Returns the auto-increment keyword, or an empty string when the
    /// dialect has none.
    fn auto_increment(&self) -> &'static str {
        ""
    }
}
