//! Declarative schema synchronization for MySQL.
//!
//! `schemasync` reads the schema a database *should* have from a JSON
//! declaration, reads the schema it *does* have from `information_schema`,
//! and emits the DDL that closes the gap:
//! - Missing tables are created, tables absent from the declaration dropped
//! - Columns are added in declared position (`FIRST` / `AFTER`), dropped or
//!   modified in place
//! - Indexes are dropped and re-added whenever their definition changes
//!
//! The pure model and diff engine live in [`schemasync_core`]; this crate
//! adds declaration loading, introspection and transactional application.
//!
//! # Example
//!
//! ```rust,ignore
//! use schemasync::prelude::*;
//! use sqlx::mysql::MySqlPoolOptions;
//!
//! let pool = MySqlPoolOptions::new().connect("mysql://root@localhost/app").await?;
//! let desired = load_desired(Path::new("schema.json"))?;
//!
//! let sync = SchemaSync::new(pool.clone(), MySqlIntrospector::new(pool), MySqlDialect);
//! for sql in sync.sync(&desired).await? {
//!     println!("{sql};");
//! }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show the statements without applying them
//! schemasync --database-url mysql://root@localhost/app diff schema.json
//!
//! # Apply them
//! schemasync sync schema.json
//!
//! # Dump the live schema as JSON
//! schemasync inspect > snapshot.json
//! ```

pub mod declare;
pub mod error;
pub mod executor;
pub mod introspect;

pub use schemasync_core;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::declare::{Declaration, load_desired, load_snapshot};
    pub use crate::error::{Result, SyncError};
    pub use crate::executor::{SchemaSync, SyncOptions, apply_statements};
    pub use crate::introspect::{Introspector, MySqlIntrospector};
    pub use schemasync_core::prelude::*;
}
