//! Schema diff engine.
//!
//! Compares a desired [`Schema`] against an observed one and produces the
//! ordered DDL statements that bring the observed schema in line:
//!
//! 1. For each desired table, in name order: `CREATE TABLE` when it does not
//!    exist yet, otherwise at most one `ALTER TABLE`.
//! 2. `DROP TABLE` for every observed table that is no longer desired, in
//!    name order.
//!
//! An `ALTER TABLE` carries its sub-clauses in a fixed order: column adds,
//! column drops, column modifies, index drops, index adds. Tables with
//! nothing to change produce no statement.
//!
//! Keys never go through `MODIFY`. On a column kept by both sides, the
//! `primary_key` and `unique` flags stand for the `PRIMARY` index and a
//! unique index named after the column, and are diffed as indexes.
//!
//! The engine is pure: it does no I/O, never mutates its inputs and returns
//! byte-identical output for identical inputs.

use std::collections::{BTreeMap, HashSet};

use crate::dialect::Dialect;
use crate::render::{render_column, render_index_definition, resolve_type};
use crate::schema::{Column, Index, PRIMARY_INDEX, Schema, Table};

/// The sub-clauses of one `ALTER TABLE`, grouped in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlterPlan {
    /// `ADD <column> FIRST|AFTER <col>`.
    pub add_columns: Vec<String>,
    /// `DROP <column>`.
    pub drop_columns: Vec<String>,
    /// `MODIFY <column>`.
    pub modify_columns: Vec<String>,
    /// `DROP PRIMARY KEY` / `DROP INDEX <name>`.
    pub drop_indexes: Vec<String>,
    /// `ADD <index definition>`.
    pub add_indexes: Vec<String>,
}

impl AlterPlan {
    /// Returns true if there is nothing to alter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add_columns.is_empty()
            && self.drop_columns.is_empty()
            && self.modify_columns.is_empty()
            && self.drop_indexes.is_empty()
            && self.add_indexes.is_empty()
    }

    /// Returns all clauses in emission order.
    #[must_use]
    pub fn into_clauses(self) -> Vec<String> {
        let mut clauses = self.add_columns;
        clauses.extend(self.drop_columns);
        clauses.extend(self.modify_columns);
        clauses.extend(self.drop_indexes);
        clauses.extend(self.add_indexes);
        clauses
    }
}

/// Returns whether two definitions of the same column differ materially.
///
/// Compared: base logical type, SQL type (which carries the size class),
/// effective nullability, default and auto-increment. Comments are not
/// compared, and neither are the `primary_key` and `unique` flags: those
/// are keys and change through the index step.
pub fn column_differs<D: Dialect + ?Sized>(
    dialect: &D,
    desired: &Column,
    observed: &Column,
) -> bool {
    desired.logical_type.base() != observed.logical_type.base()
        || resolve_type(dialect, desired) != resolve_type(dialect, observed)
        || desired.default != observed.default
        || desired.auto_increment != observed.auto_increment
}

/// Returns a table's indexes by name, plus the keys implied by the column
/// flags of the `shared` columns: one `PRIMARY` index over every
/// `primary_key` column and one unique index per `unique` column.
///
/// Explicit indexes win over implied ones with the same name.
fn key_indexes(table: &Table, shared: &HashSet<&str>) -> BTreeMap<String, Index> {
    let mut indexes: BTreeMap<String, Index> = table
        .indexes
        .iter()
        .map(|i| (i.name.clone(), i.clone()))
        .collect();

    let columns: Vec<&Column> = table
        .columns
        .iter()
        .filter(|c| !c.ignore && shared.contains(c.name.as_str()))
        .collect();

    let primary: Vec<&str> = columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.as_str())
        .collect();
    if !primary.is_empty() {
        indexes
            .entry(PRIMARY_INDEX.to_string())
            .or_insert_with(|| Index::primary(primary));
    }

    for column in columns.iter().filter(|c| c.unique) {
        let name = column.name.as_str();
        indexes
            .entry(column.name.clone())
            .or_insert_with(|| Index::new(name, [name]).unique());
    }

    indexes
}

/// Computes DDL statements between schema snapshots.
#[derive(Debug)]
pub struct SchemaDiffer<'d, D: Dialect + ?Sized> {
    dialect: &'d D,
}

impl<'d, D: Dialect + ?Sized> SchemaDiffer<'d, D> {
    /// Creates a differ rendering with the given dialect.
    #[must_use]
    pub fn new(dialect: &'d D) -> Self {
        Self { dialect }
    }

    /// Returns the ordered statements that turn `observed` into `desired`.
    #[must_use]
    pub fn diff(&self, desired: &Schema, observed: &Schema) -> Vec<String> {
        let mut statements = Vec::new();

        for (name, table) in &desired.tables {
            match observed.get(name) {
                None => statements.push(self.create_table(table)),
                Some(current) => statements.extend(self.alter_table(table, current)),
            }
        }

        for name in observed.table_names() {
            if desired.get(name).is_none() {
                statements.push(self.drop_table(name));
            }
        }

        statements
    }

    /// Renders `CREATE TABLE` with every column, then every index.
    #[must_use]
    pub fn create_table(&self, table: &Table) -> String {
        let definitions: Vec<String> = table
            .columns
            .iter()
            .filter(|c| !c.ignore)
            .map(|c| render_column(self.dialect, c))
            .chain(
                table
                    .indexes
                    .iter()
                    .map(|i| render_index_definition(self.dialect, i)),
            )
            .collect();

        format!(
            "CREATE TABLE {} (\n  {}\n)",
            self.dialect.quote(&table.name),
            definitions.join(", ")
        )
    }

    /// Renders `DROP TABLE`.
    #[must_use]
    pub fn drop_table(&self, name: &str) -> String {
        format!("DROP TABLE {}", self.dialect.quote(name))
    }

    /// Renders one `ALTER TABLE`, or `None` when the tables already match.
    #[must_use]
    pub fn alter_table(&self, desired: &Table, observed: &Table) -> Option<String> {
        let plan = self.plan_alter(desired, observed);
        if plan.is_empty() {
            return None;
        }
        Some(format!(
            "ALTER TABLE {} {}",
            self.dialect.quote(&desired.name),
            plan.into_clauses().join(", ")
        ))
    }

    /// Computes the sub-clauses needed to turn `observed` into `desired`.
    #[must_use]
    pub fn plan_alter(&self, desired: &Table, observed: &Table) -> AlterPlan {
        let desired_columns: Vec<&Column> =
            desired.columns.iter().filter(|c| !c.ignore).collect();
        let observed_columns = observed.column_map();

        let mut plan = AlterPlan::default();

        for (position, column) in desired_columns.iter().enumerate() {
            if observed_columns.contains_key(column.name.as_str()) {
                continue;
            }
            let placement = match position.checked_sub(1) {
                None => "FIRST".to_string(),
                Some(prev) => {
                    format!("AFTER {}", self.dialect.quote(&desired_columns[prev].name))
                }
            };
            plan.add_columns.push(format!(
                "ADD {} {}",
                render_column(self.dialect, column),
                placement
            ));
        }

        let desired_names: HashSet<&str> =
            desired_columns.iter().map(|c| c.name.as_str()).collect();
        for column in &observed.columns {
            if !desired_names.contains(column.name.as_str()) {
                plan.drop_columns
                    .push(format!("DROP {}", self.dialect.quote(&column.name)));
            }
        }

        for column in &desired_columns {
            let Some(current) = observed_columns.get(column.name.as_str()) else {
                continue;
            };
            if column_differs(self.dialect, column, current) {
                // Keys stay where they are; the index step owns them.
                let mut definition = (*column).clone();
                definition.primary_key = false;
                definition.unique = false;
                plan.modify_columns
                    .push(format!("MODIFY {}", render_column(self.dialect, &definition)));
            }
        }

        let shared: HashSet<&str> = desired_names
            .iter()
            .copied()
            .filter(|name| observed_columns.contains_key(name))
            .collect();
        let desired_indexes = key_indexes(desired, &shared);
        let observed_indexes = key_indexes(observed, &shared);

        for (name, index) in &observed_indexes {
            if desired_indexes.get(name) == Some(index) {
                continue;
            }
            if index.is_primary() {
                plan.drop_indexes.push("DROP PRIMARY KEY".to_string());
            } else {
                plan.drop_indexes
                    .push(format!("DROP INDEX {}", self.dialect.quote(name)));
            }
        }

        for (name, index) in &desired_indexes {
            if observed_indexes.get(name) == Some(index) {
                continue;
            }
            plan.add_indexes.push(format!(
                "ADD {}",
                render_index_definition(self.dialect, index)
            ));
        }

        plan
    }
}

/// Returns the ordered statements that turn `observed` into `desired`.
#[must_use]
pub fn diff<D: Dialect + ?Sized>(dialect: &D, desired: &Schema, observed: &Schema) -> Vec<String> {
    SchemaDiffer::new(dialect).diff(desired, observed)
}
