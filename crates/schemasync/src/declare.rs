//! Declarative schema files.
//!
//! A declaration is a JSON document listing the tables the database should
//! have. Column and index options use the same mini-language as
//! [`schemasync_core::options`]:
//!
//! ```json
//! {
//!   "tables": [
//!     {
//!       "name": "user",
//!       "columns": [
//!         { "name": "id", "type": "int64", "tag": "pk;autoincrement" },
//!         { "name": "email", "type": "string", "tag": "size:120;unique" },
//!         { "name": "bio", "type": "Option<String>", "comment": "shown on profile" }
//!       ],
//!       "indexes": ["index:email_bio_idx,email,bio"]
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use schemasync_core::{Column, ColumnOptions, Schema, Table, parse_index_tag};

use crate::error::{Result, SyncError};

/// A column as written in a declaration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDeclaration {
    /// Column name.
    pub name: String,
    /// Logical type tag.
    #[serde(rename = "type")]
    pub logical_type: String,
    /// Option string, e.g. `pk;autoincrement`.
    #[serde(default)]
    pub tag: String,
    /// Column comment.
    #[serde(default)]
    pub comment: Option<String>,
    /// Nullability override.
    #[serde(default)]
    pub nullable: Option<bool>,
}

impl ColumnDeclaration {
    fn into_column(self, table: &str) -> Result<Column> {
        let options = ColumnOptions::parse(&self.tag).map_err(|source| SyncError::Tag {
            location: format!("column '{table}.{}'", self.name),
            source,
        })?;

        let mut column = Column::new(self.name, self.logical_type.as_str());
        column.nullable = self.nullable;
        column.comment = self
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Ok(options.apply(column))
    }
}

/// A table as written in a declaration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDeclaration {
    /// Table name.
    pub name: String,
    /// Columns, in order.
    #[serde(default)]
    pub columns: Vec<ColumnDeclaration>,
    /// Index option strings.
    #[serde(default)]
    pub indexes: Vec<String>,
}

impl TableDeclaration {
    fn into_table(self) -> Result<Table> {
        let mut table = Table::new(self.name.as_str());
        for column in self.columns {
            table = table.column(column.into_column(&self.name)?);
        }
        for tag in &self.indexes {
            let index = parse_index_tag(tag).map_err(|source| SyncError::Tag {
                location: format!("index `{tag}` on table '{}'", self.name),
                source,
            })?;
            table = table.index(index);
        }
        Ok(table)
    }
}

/// A whole declaration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declaration {
    /// Declared tables.
    #[serde(default)]
    pub tables: Vec<TableDeclaration>,
}

impl Declaration {
    /// Parses a declaration from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a declaration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| SyncError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Builds the normalized desired schema.
    pub fn into_schema(self) -> Result<Schema> {
        let mut schema = Schema::new();
        for declaration in self.tables {
            let table = declaration.into_table()?;
            let name = table.name.clone();
            if schema.insert(table).is_some() {
                return Err(SyncError::DuplicateTable(name));
            }
        }
        Ok(schema.normalize())
    }
}

/// Loads a declaration file and returns the desired schema.
pub fn load_desired(path: &Path) -> Result<Schema> {
    Declaration::load(path)?.into_schema()
}

/// Loads a schema snapshot previously written by `schemasync inspect`.
pub fn load_snapshot(path: &Path) -> Result<Schema> {
    let text = std::fs::read_to_string(path)?;
    let schema: Schema = serde_json::from_str(&text).map_err(|e| SyncError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(schema.normalize())
}
