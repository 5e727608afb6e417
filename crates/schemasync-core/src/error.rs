//! Error types for the schema option mini-language.

/// Errors raised while parsing column or index option strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    /// An option name that is not part of the recognized set.
    #[error("unknown option: `{0}`")]
    UnknownOption(String),

    /// An option that requires a parameter was given none.
    #[error("`{option}` option must specify the parameter")]
    MissingParameter {
        /// The option missing its parameter.
        option: String,
    },

    /// A numeric parameter could not be parsed.
    #[error("`{option}` option has an invalid value `{value}`: {reason}")]
    InvalidNumber {
        /// The option carrying the bad value.
        option: String,
        /// The raw value.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// An index option string was empty.
    #[error("index tag must not be empty")]
    EmptyIndexTag,

    /// An index option string did not name the index or mark it primary.
    #[error("index tag `{0}` must specify `pk` or `index:<name>,<columns>`")]
    IncompleteIndexTag(String),

    /// An `index:` option had no column names.
    #[error("`index` option must specify one column at least")]
    MissingIndexColumns,
}

/// Result type for option parsing.
pub type Result<T> = std::result::Result<T, TagError>;
