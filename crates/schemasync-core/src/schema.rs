//! Schema representation types.
//!
//! These types describe tables, columns and indexes independently of any
//! SQL engine. The same types hold both sides of a diff: the desired schema
//! built from declarations and the observed schema read from a live catalog.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved index name denoting the primary key.
pub const PRIMARY_INDEX: &str = "PRIMARY";

/// Dialect-agnostic column type.
///
/// Parsing a tag never fails: anything unrecognized becomes
/// [`LogicalType::Other`], which dialects map to a wide character type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogicalType {
    /// Boolean.
    Bool,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// Single precision float.
    Float32,
    /// Double precision float.
    Float64,
    /// Character data, sized by the column's `size`.
    String,
    /// Date and time.
    DateTime,
    /// Nullable form of the wrapped type.
    Nullable(Box<LogicalType>),
    /// A tag no dialect knows about.
    Other(String),
}

impl LogicalType {
    /// Parses a type tag.
    ///
    /// Accepts canonical tags (`int64`, `string`), Rust spellings (`i64`,
    /// `String`) and the nullable forms `nullable-<t>`, `Option<t>` and `*<t>`.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim();
        if let Some(inner) = tag
            .strip_prefix("Option<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return Self::parse(inner).into_nullable();
        }
        if let Some(inner) = tag
            .strip_prefix("nullable-")
            .or_else(|| tag.strip_prefix('*'))
        {
            return Self::parse(inner).into_nullable();
        }
        match tag {
            "bool" => Self::Bool,
            "int8" | "i8" => Self::Int8,
            "int16" | "i16" => Self::Int16,
            "int" | "int32" | "i32" => Self::Int32,
            "int64" | "i64" => Self::Int64,
            "uint8" | "u8" => Self::UInt8,
            "uint16" | "u16" => Self::UInt16,
            "uint" | "uint32" | "u32" => Self::UInt32,
            "uint64" | "u64" => Self::UInt64,
            "float32" | "f32" => Self::Float32,
            "float64" | "f64" => Self::Float64,
            "string" | "String" | "&str" => Self::String,
            "datetime" | "NaiveDateTime" | "DateTime<Utc>" => Self::DateTime,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wraps this type as nullable. Already-nullable types are unchanged.
    #[must_use]
    pub fn into_nullable(self) -> Self {
        match self {
            Self::Nullable(_) => self,
            other => Self::Nullable(Box::new(other)),
        }
    }

    /// Returns the type with any nullable wrapper removed.
    #[must_use]
    pub fn base(&self) -> &Self {
        match self {
            Self::Nullable(inner) => inner.base(),
            other => other,
        }
    }

    /// Returns whether this is a nullable form.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable(_))
    }

    /// Returns whether the column's `size` affects the SQL type.
    #[must_use]
    pub fn is_sized(&self) -> bool {
        matches!(self.base(), Self::String)
    }

    /// Returns whether the base type is character data.
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self.base(), Self::String)
    }

    /// Returns whether the base type is boolean.
    #[must_use]
    pub fn is_bool(&self) -> bool {
        matches!(self.base(), Self::Bool)
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::DateTime => "datetime",
            Self::Nullable(inner) => return write!(f, "nullable-{inner}"),
            Self::Other(tag) => tag,
        };
        f.write_str(tag)
    }
}

impl From<&str> for LogicalType {
    fn from(tag: &str) -> Self {
        Self::parse(tag)
    }
}

impl From<String> for LogicalType {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<LogicalType> for String {
    fn from(ty: LogicalType) -> Self {
        ty.to_string()
    }
}

/// Default capacity for sized types declared without a size.
pub const DEFAULT_STRING_SIZE: u64 = 255;

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Logical type tag.
    #[serde(rename = "type")]
    pub logical_type: LogicalType,
    /// Capacity hint for sized types (0 = dialect default).
    #[serde(default)]
    pub size: u64,
    /// Nullability override. `None` means derived from the type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Default value literal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Whether this column is the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Whether this column auto-increments.
    #[serde(default)]
    pub auto_increment: bool,
    /// Whether this column has a UNIQUE constraint.
    #[serde(default)]
    pub unique: bool,
    /// Column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Excluded from the desired schema entirely.
    #[serde(default, skip_serializing)]
    pub ignore: bool,
}

impl Column {
    /// Creates a new column.
    #[must_use]
    pub fn new(name: impl Into<String>, logical_type: impl Into<LogicalType>) -> Self {
        Self {
            name: name.into(),
            logical_type: logical_type.into(),
            size: 0,
            nullable: None,
            default: None,
            primary_key: false,
            auto_increment: false,
            unique: false,
            comment: None,
            ignore: false,
        }
    }

    /// Sets the size hint.
    #[must_use]
    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Overrides the nullability derived from the type.
    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the column as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets the column to auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the column as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the column comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Marks the column as ignored.
    #[must_use]
    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Returns the size after applying the sized-type rules: sized types
    /// default to [`DEFAULT_STRING_SIZE`], other types carry no size.
    #[must_use]
    pub fn effective_size(&self) -> u64 {
        match (self.logical_type.is_sized(), self.size) {
            (true, 0) => DEFAULT_STRING_SIZE,
            (true, size) => size,
            (false, _) => 0,
        }
    }
}

/// Schema definition for an index.
///
/// Two indexes are equivalent iff name, unique flag and the ordered column
/// list are all equal, which is exactly the derived `PartialEq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    /// Index name. [`PRIMARY_INDEX`] denotes the primary key.
    pub name: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    #[serde(default)]
    pub unique: bool,
}

impl Index {
    /// Creates a new non-unique index. The name `PRIMARY` is always unique.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let unique = name == PRIMARY_INDEX;
        Self {
            name,
            columns: columns.into_iter().map(Into::into).collect(),
            unique,
        }
    }

    /// Creates the primary key index.
    #[must_use]
    pub fn primary<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(PRIMARY_INDEX, columns)
    }

    /// Marks the index as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Returns whether this index is the primary key.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.name == PRIMARY_INDEX
    }
}

/// Complete schema definition for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Column definitions, in declared order.
    pub columns: Vec<Column>,
    /// Index definitions.
    #[serde(default)]
    pub indexes: Vec<Index>,
}

impl Table {
    /// Creates a new table schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Adds a column to the table. Ignored columns are dropped here.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        if !column.ignore {
            self.columns.push(column);
        }
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Gets an index by name.
    #[must_use]
    pub fn get_index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Returns the columns keyed by name.
    #[must_use]
    pub fn column_map(&self) -> HashMap<&str, &Column> {
        self.columns.iter().map(|c| (c.name.as_str(), c)).collect()
    }

    /// Returns the indexes keyed by name, in name order.
    #[must_use]
    pub fn index_map(&self) -> BTreeMap<&str, &Index> {
        self.indexes.iter().map(|i| (i.name.as_str(), i)).collect()
    }

    /// Brings the table into canonical form.
    ///
    /// Both sides of a diff should be normalized so that inline column flags
    /// and catalog-reported indexes describe the same thing the same way:
    ///
    /// - ignored columns are removed and sizes follow [`Column::effective_size`];
    /// - a `PRIMARY` index over one column becomes that column's
    ///   `primary_key` flag, while several flagged columns become one
    ///   `PRIMARY` index;
    /// - a unique one-column index named after its column becomes that
    ///   column's `unique` flag.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        self.columns.retain(|c| !c.ignore);
        for column in &mut self.columns {
            column.size = column.effective_size();
        }

        let mut kept = Vec::with_capacity(self.indexes.len());
        for mut index in std::mem::take(&mut self.indexes) {
            if index.is_primary() {
                index.unique = true;
            }
            if !self.fold_index(&index) {
                kept.push(index);
            }
        }
        self.indexes = kept;

        let flagged: Vec<String> = self
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        if flagged.len() > 1 && self.get_index(PRIMARY_INDEX).is_none() {
            for column in &mut self.columns {
                column.primary_key = false;
            }
            self.indexes.push(Index::primary(flagged));
        }

        self
    }

    /// Moves a single-column index onto its column's flags. Returns whether
    /// the index was folded.
    fn fold_index(&mut self, index: &Index) -> bool {
        let [only] = index.columns.as_slice() else {
            return false;
        };
        let primary = index.is_primary();
        if !primary && !(index.unique && index.name == *only) {
            return false;
        }
        match self.columns.iter_mut().find(|c| c.name == *only) {
            Some(column) if primary => {
                column.primary_key = true;
                true
            }
            Some(column) => {
                column.unique = true;
                true
            }
            None => false,
        }
    }
}

/// A full schema snapshot: table name to table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    /// All tables, keyed and ordered by name.
    pub tables: BTreeMap<String, Table>,
}

impl Schema {
    /// Creates a new empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table to the schema.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.insert(table);
        self
    }

    /// Inserts a table, returning any table previously stored under its name.
    pub fn insert(&mut self, table: Table) -> Option<Table> {
        self.tables.insert(table.name.clone(), table)
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Returns table names in lexicographic order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Returns the number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns whether the schema has no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Normalizes every table. See [`Table::normalize`].
    #[must_use]
    pub fn normalize(self) -> Self {
        Self {
            tables: self
                .tables
                .into_iter()
                .map(|(name, table)| (name, table.normalize()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_type_parse() {
        assert_eq!(LogicalType::parse("int64"), LogicalType::Int64);
        assert_eq!(LogicalType::parse("i64"), LogicalType::Int64);
        assert_eq!(LogicalType::parse("int"), LogicalType::Int32);
        assert_eq!(LogicalType::parse("String"), LogicalType::String);
        assert_eq!(
            LogicalType::parse("jsonb"),
            LogicalType::Other("jsonb".to_string())
        );
    }

    #[test]
    fn test_logical_type_nullable_forms() {
        let expected = LogicalType::String.into_nullable();
        assert_eq!(LogicalType::parse("nullable-string"), expected);
        assert_eq!(LogicalType::parse("Option<String>"), expected);
        assert_eq!(LogicalType::parse("*string"), expected);
        // Nested wrappers collapse.
        assert_eq!(LogicalType::parse("Option<nullable-string>"), expected);
        assert_eq!(expected.base(), &LogicalType::String);
        assert!(expected.is_sized());
    }

    #[test]
    fn test_logical_type_display_round_trips() {
        for tag in ["bool", "uint16", "nullable-datetime", "geometry"] {
            assert_eq!(LogicalType::parse(tag).to_string(), tag);
        }
    }

    #[test]
    fn test_column_builder() {
        let col = Column::new("id", "int64").primary_key().auto_increment();

        assert_eq!(col.name, "id");
        assert_eq!(col.logical_type, LogicalType::Int64);
        assert!(col.primary_key);
        assert!(col.auto_increment);
        assert_eq!(col.nullable, None);
    }

    #[test]
    fn test_effective_size() {
        assert_eq!(Column::new("name", "string").effective_size(), 255);
        assert_eq!(Column::new("name", "string").size(50).effective_size(), 50);
        assert_eq!(Column::new("id", "int64").size(50).effective_size(), 0);
    }

    #[test]
    fn test_primary_index_is_unique() {
        let index = Index::primary(["id"]);
        assert!(index.unique);
        assert!(index.is_primary());
        assert!(!Index::new("name_idx", ["name"]).unique);
    }

    #[test]
    fn test_table_skips_ignored_columns() {
        let table = Table::new("user")
            .column(Column::new("id", "int64"))
            .column(Column::new("cache", "string").ignore());

        assert_eq!(table.columns.len(), 1);
        assert!(table.get_column("cache").is_none());
    }

    #[test]
    fn test_normalize_folds_single_column_indexes() {
        let table = Table::new("user")
            .column(Column::new("id", "int64"))
            .column(Column::new("email", "string"))
            .column(Column::new("name", "string"))
            .index(Index::primary(["id"]))
            .index(Index::new("email", ["email"]).unique())
            .index(Index::new("name_idx", ["name"]).unique())
            .normalize();

        assert!(table.get_column("id").unwrap().primary_key);
        assert!(table.get_column("email").unwrap().unique);
        assert!(!table.get_column("name").unwrap().unique);
        assert_eq!(table.indexes, vec![Index::new("name_idx", ["name"]).unique()]);
        assert_eq!(table.get_column("name").unwrap().size, 255);
    }

    #[test]
    fn test_normalize_composite_primary_key() {
        let table = Table::new("membership")
            .column(Column::new("user_id", "int64").primary_key())
            .column(Column::new("group_id", "int64").primary_key())
            .normalize();

        assert!(table.columns.iter().all(|c| !c.primary_key));
        assert_eq!(
            table.indexes,
            vec![Index::primary(["user_id", "group_id"])]
        );

        // Already canonical: normalizing again changes nothing.
        assert_eq!(table.clone().normalize(), table);
    }

    #[test]
    fn test_schema_table_names_sorted() {
        let schema = Schema::new()
            .table(Table::new("user"))
            .table(Table::new("article"))
            .table(Table::new("comment"));

        let names: Vec<&str> = schema.table_names().collect();
        assert_eq!(names, vec!["article", "comment", "user"]);
    }

    #[test]
    fn test_schema_json_round_trip() {
        let schema = Schema::new().table(
            Table::new("user")
                .column(Column::new("id", "int64").primary_key())
                .column(Column::new("nick", "Option<String>").size(32)),
        );

        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("\"type\":\"nullable-string\""));
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
