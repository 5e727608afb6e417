//! Column and index option strings.
//!
//! Declarations attach options as `name[:value]` pairs separated by `;`,
//! e.g. `pk;autoincrement` or `size:64;default:guest`. Index declarations
//! use `index:<name>,<col1>[,<col2>...]`, `unique` and `pk`.

use crate::error::{Result, TagError};
use crate::schema::{Column, Index, PRIMARY_INDEX};

/// Separator between options.
pub const OPTION_SEPARATOR: char = ';';

const OPT_DEFAULT: &str = "default";
const OPT_PRIMARY_KEY: &str = "pk";
const OPT_AUTO_INCREMENT: &str = "autoincrement";
const OPT_UNIQUE: &str = "unique";
const OPT_SIZE: &str = "size";
const OPT_INDEX: &str = "index";
const OPT_IGNORE: &str = "-";

/// Splits an option string into `(name, value)` pairs, skipping empty
/// segments.
fn split_options(tag: &str) -> impl Iterator<Item = (&str, Option<&str>)> {
    tag.split(OPTION_SEPARATOR)
        .map(str::trim)
        .filter(|opt| !opt.is_empty())
        .map(|opt| match opt.split_once(':') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (opt, None),
        })
}

/// Parsed per-column options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnOptions {
    /// `default:<literal>`.
    pub default: Option<String>,
    /// `pk`.
    pub primary_key: bool,
    /// `autoincrement`.
    pub auto_increment: bool,
    /// `unique`.
    pub unique: bool,
    /// `size:<n>`.
    pub size: Option<u64>,
    /// `-`.
    pub ignore: bool,
}

impl ColumnOptions {
    /// Parses a column option string. An empty string yields no options.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::UnknownOption`] for unrecognized names,
    /// [`TagError::MissingParameter`] when `size` has no value and
    /// [`TagError::InvalidNumber`] when it is not a non-negative integer.
    pub fn parse(tag: &str) -> Result<Self> {
        let mut options = Self::default();
        for (name, value) in split_options(tag) {
            match name {
                OPT_DEFAULT => {
                    options.default = value.filter(|v| !v.is_empty()).map(str::to_string);
                }
                OPT_PRIMARY_KEY => options.primary_key = true,
                OPT_AUTO_INCREMENT => options.auto_increment = true,
                OPT_UNIQUE => options.unique = true,
                OPT_IGNORE => options.ignore = true,
                OPT_SIZE => {
                    let raw = value.ok_or_else(|| TagError::MissingParameter {
                        option: OPT_SIZE.to_string(),
                    })?;
                    let size = raw.parse::<u64>().map_err(|e| TagError::InvalidNumber {
                        option: OPT_SIZE.to_string(),
                        value: raw.to_string(),
                        reason: e.to_string(),
                    })?;
                    options.size = Some(size);
                }
                _ => {
                    let opt = match value {
                        Some(v) => format!("{name}:{v}"),
                        None => name.to_string(),
                    };
                    return Err(TagError::UnknownOption(opt));
                }
            }
        }
        Ok(options)
    }

    /// Applies the options to a column.
    ///
    /// Boolean defaults are normalized to `1`/`0`.
    #[must_use]
    pub fn apply(self, mut column: Column) -> Column {
        if let Some(value) = self.default {
            column.default = Some(if column.logical_type.is_bool() {
                normalize_bool_default(&value).to_string()
            } else {
                value
            });
        }
        column.primary_key |= self.primary_key;
        column.auto_increment |= self.auto_increment;
        column.unique |= self.unique;
        column.ignore |= self.ignore;
        if let Some(size) = self.size {
            column.size = size;
        }
        column
    }
}

/// Maps `1`, `true` and `on` (any case) to `1`, anything else to `0`.
fn normalize_bool_default(value: &str) -> &'static str {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => "1",
        _ => "0",
    }
}

/// Parses an index option string into an [`Index`].
///
/// `index:<name>` with a single parameter uses it as both the index name
/// and its sole column. `pk` forces the name to `PRIMARY` and the index to
/// be unique.
///
/// # Errors
///
/// Fails on an empty string, unknown options, `index` without columns, or
/// a string that names neither `pk` nor any columns.
pub fn parse_index_tag(tag: &str) -> Result<Index> {
    if tag.trim().is_empty() {
        return Err(TagError::EmptyIndexTag);
    }

    let mut name = String::new();
    let mut columns = Vec::new();
    let mut unique = false;
    let mut primary = false;

    for (opt, value) in split_options(tag) {
        match opt {
            OPT_PRIMARY_KEY => primary = true,
            OPT_UNIQUE => unique = true,
            OPT_INDEX => {
                let raw = value.ok_or_else(|| TagError::MissingParameter {
                    option: OPT_INDEX.to_string(),
                })?;
                let params: Vec<&str> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .collect();
                match params.as_slice() {
                    [] => return Err(TagError::MissingIndexColumns),
                    [only] => {
                        name = (*only).to_string();
                        columns = vec![(*only).to_string()];
                    }
                    [first, rest @ ..] => {
                        name = (*first).to_string();
                        columns = rest.iter().map(|c| (*c).to_string()).collect();
                    }
                }
            }
            _ => {
                let opt = match value {
                    Some(v) => format!("{opt}:{v}"),
                    None => opt.to_string(),
                };
                return Err(TagError::UnknownOption(opt));
            }
        }
    }

    if columns.is_empty() {
        return Err(TagError::IncompleteIndexTag(tag.to_string()));
    }

    if primary {
        name = PRIMARY_INDEX.to_string();
        unique = true;
    }

    Ok(Index {
        name,
        columns,
        unique,
    })
}
