//! # schemasync-core
//!
//! Schema model, SQL dialects and the DDL diff engine behind `schemasync`.
//!
//! This crate provides:
//! - A neutral schema model ([`Table`], [`Column`], [`Index`]) shared by the
//!   desired and the observed side of a diff
//! - Dialects mapping logical types to SQL types and quoting identifiers
//! - Column and index clause rendering
//! - A deterministic diff engine producing `CREATE`/`ALTER`/`DROP TABLE`
//! - The option mini-language used by declarations (`pk;autoincrement`)
//!
//! Nothing here performs I/O. Introspecting a live database and applying
//! statements live in the `schemasync` crate.
//!
//! ## Example
//!
//! ```rust
//! use schemasync_core::prelude::*;
//!
//! let desired = Schema::new().table(
//!     Table::new("users")
//!         .column(Column::new("id", "int64").primary_key().auto_increment())
//!         .column(Column::new("name", "string").size(50)),
//! );
//! let observed = Schema::new();
//!
//! let statements = diff(&MySqlDialect, &desired, &observed);
//! assert_eq!(
//!     statements,
//!     vec![
//!         "CREATE TABLE `users` (\n  `id` BIGINT NOT NULL PRIMARY KEY AUTO_INCREMENT, \
//!          `name` VARCHAR(50) NOT NULL\n)"
//!     ]
//! );
//! ```

pub mod dialect;
pub mod diff;
pub mod error;
pub mod options;
pub mod render;
pub mod schema;

pub use dialect::{ColumnType, Dialect, MySqlDialect};
pub use diff::{AlterPlan, SchemaDiffer, diff};
pub use error::TagError;
pub use options::{ColumnOptions, parse_index_tag};
pub use schema::{Column, Index, LogicalType, PRIMARY_INDEX, Schema, Table};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dialect::{ColumnType, Dialect, MySqlDialect};
    pub use crate::diff::{SchemaDiffer, diff};
    pub use crate::error::TagError;
    pub use crate::options::{ColumnOptions, parse_index_tag};
    pub use crate::render::{render_column, render_index_definition};
    pub use crate::schema::{Column, Index, LogicalType, Schema, Table};
}
