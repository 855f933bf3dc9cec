//! Typed errors for the decision core
//!
//! Under-specified input is not an error: the engine returns an empty
//! recommendation. A pending assumption check is not an error either: it is
//! a verdict. Only malformed identifiers, broken catalogs and illegal
//! controller actions surface here.

use crate::catalog::TestId;
use thiserror::Error;

/// Failure to interpret an input label
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("unknown value '{value}' for {field}")]
    UnknownValue { field: &'static str, value: String },

    #[error("unknown input field '{0}'")]
    UnknownField(String),
}

/// Catalog construction and lookup failures
///
/// All of these are configuration defects. A catalog that has been built
/// successfully can never produce them again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unknown test identifier '{0}'")]
    UnknownTestId(String),

    #[error("catalog has no entry for {0}")]
    MissingEntry(TestId),

    #[error("catalog has more than one entry for {0}")]
    DuplicateEntry(TestId),

    #[error("{0} cannot be its own alternative")]
    SelfAlternative(TestId),
}

/// Illegal action for the current selection state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("{0} is not one of the recommended tests")]
    NotRecommended(TestId),

    #[error("manual selection is disabled")]
    ManualSelectionDisabled,
}

/// Dataset construction failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    #[error("column '{name}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("row {row}: expected a JSON object")]
    RowNotObject { row: usize },

    #[error("row {row}, column '{column}': unsupported value (nested arrays and objects are not cells)")]
    UnsupportedCell { row: usize, column: String },
}
