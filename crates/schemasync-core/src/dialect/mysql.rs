//! MySQL dialect.

use crate::schema::{DEFAULT_STRING_SIZE, LogicalType};

use super::{ColumnType, Dialect};

/// Largest size still rendered as `VARCHAR(n)` (utf8mb3 row limit).
const MAX_VARCHAR_SIZE: u64 = 21845;
/// Largest size that fits in `TEXT` (64KB).
const MAX_TEXT_SIZE: u64 = 65535;
/// Sizes below this fit in `MEDIUMTEXT` (16MB).
const MEDIUMTEXT_LIMIT: u64 = 1 << 24;

/// Fallback for types MySQL does not know about.
const FALLBACK_TYPE: &str = "VARCHAR(255)";

/// MySQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn varchar(size: u64) -> String {
        let size = if size == 0 { DEFAULT_STRING_SIZE } else { size };
        match size {
            s if s <= MAX_VARCHAR_SIZE => format!("VARCHAR({s})"),
            s if s <= MAX_TEXT_SIZE => "TEXT".to_string(),
            s if s < MEDIUMTEXT_LIMIT => "MEDIUMTEXT".to_string(),
            _ => "LONGTEXT".to_string(),
        }
    }

    fn base_type(logical_type: &LogicalType, size: u64) -> Option<String> {
        let name = match logical_type {
            LogicalType::String => return Some(Self::varchar(size)),
            LogicalType::Bool => "BOOL",
            LogicalType::Int8 => "TINYINT",
            LogicalType::Int16 => "SMALLINT",
            LogicalType::Int32 => "INT",
            LogicalType::Int64 => "BIGINT",
            LogicalType::UInt8 => "TINYINT UNSIGNED",
            LogicalType::UInt16 => "SMALLINT UNSIGNED",
            LogicalType::UInt32 => "INT UNSIGNED",
            LogicalType::UInt64 => "BIGINT UNSIGNED",
            LogicalType::Float32 => "FLOAT",
            LogicalType::Float64 => "DOUBLE",
            LogicalType::DateTime => "DATETIME",
            LogicalType::Nullable(_) | LogicalType::Other(_) => return None,
        };
        Some(name.to_string())
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn column_type(
        &self,
        logical_type: &LogicalType,
        size: u64,
        _auto_increment: bool,
    ) -> ColumnType {
        let nullable = logical_type.is_nullable();
        match Self::base_type(logical_type.base(), size) {
            Some(sql_type) => ColumnType::new(sql_type, nullable),
            None => ColumnType::new(FALLBACK_TYPE, true),
        }
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn auto_increment(&self) -> &'static str {
        "AUTO_INCREMENT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_type(tag: &str, size: u64) -> ColumnType {
        MySqlDialect::new().column_type(&LogicalType::parse(tag), size, false)
    }

    #[test]
    fn test_string_size_classes() {
        assert_eq!(sql_type("string", 0).sql_type, "VARCHAR(255)");
        assert_eq!(sql_type("string", 50).sql_type, "VARCHAR(50)");
        assert_eq!(sql_type("string", 21845).sql_type, "VARCHAR(21845)");
        assert_eq!(sql_type("string", 21846).sql_type, "TEXT");
        assert_eq!(sql_type("string", 65535).sql_type, "TEXT");
        assert_eq!(sql_type("string", 65536).sql_type, "MEDIUMTEXT");
        assert_eq!(sql_type("string", (1 << 24) - 1).sql_type, "MEDIUMTEXT");
        assert_eq!(sql_type("string", 1 << 24).sql_type, "LONGTEXT");
    }

    #[test]
    fn test_fixed_types_and_nullable_variants() {
        assert_eq!(sql_type("int64", 0), ColumnType::new("BIGINT", false));
        assert_eq!(sql_type("Option<i64>", 0), ColumnType::new("BIGINT", true));
        assert_eq!(sql_type("*uint32", 0), ColumnType::new("INT UNSIGNED", true));
        assert_eq!(sql_type("bool", 0), ColumnType::new("BOOL", false));
        assert_eq!(sql_type("float64", 0), ColumnType::new("DOUBLE", false));
        assert_eq!(
            sql_type("nullable-datetime", 0),
            ColumnType::new("DATETIME", true)
        );
        assert_eq!(
            sql_type("nullable-string", 10),
            ColumnType::new("VARCHAR(10)", true)
        );
    }

    #[test]
    fn test_unknown_type_falls_back() {
        assert_eq!(sql_type("geometry", 0), ColumnType::new("VARCHAR(255)", true));
        assert_eq!(
            sql_type("nullable-geometry", 0),
            ColumnType::new("VARCHAR(255)", true)
        );
    }

    #[test]
    fn test_quoting() {
        let d = MySqlDialect::new();
        assert_eq!(d.quote("id"), "`id`");
        assert_eq!(d.quote("we`ird"), "`we``ird`");
        assert_eq!(d.quote_string("O'Brien"), "'O''Brien'");
        assert_eq!(d.auto_increment(), "AUTO_INCREMENT");
    }
}
