//! Error types for the planner and its input adapters.
//!
//! Fatal problems surface as [`Error`]. Individual malformed records are not
//! fatal: they are dropped and reported as [`SkippedRecord`]s on the result.

use serde::Serialize;
use thiserror::Error;

/// Which of the two input sets a record or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Pieces,
    Stock,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::Pieces => write!(f, "pieces"),
            InputKind::Stock => write!(f, "stock"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// An input set was not supplied at all
    #[error("no {kind} list supplied, both the pieces and the stock list are required")]
    MissingInput { kind: InputKind },

    /// Every record of an input set was rejected during normalization
    #[error("{kind} list has no usable records ({skipped} skipped)")]
    EmptyInput { kind: InputKind, skipped: usize },

    /// A tabular source lacks a required header
    #[error("missing column '{column}'")]
    MissingColumn { column: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Why a single record was dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("cannot parse '{input}'")]
    Unparsable { input: String },

    #[error("missing {field}")]
    MissingField { field: &'static str },

    #[error("length must be a positive whole number, got {value}")]
    InvalidLength { value: i64 },

    #[error("quantity {value} is negative or too large")]
    InvalidQuantity { value: i64 },

    #[error("quantity is zero")]
    ZeroQuantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub kind: InputKind,
    /// 1-based position of the record within its source.
    pub position: usize,
    pub reason: SkipReason,
}

impl std::fmt::Display for SkippedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} record {}: {}", self.kind, self.position, self.reason)
    }
}
