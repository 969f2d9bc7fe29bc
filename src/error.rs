use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::{CacheState, ProtocolKind};

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Failed to load trace: {0}")]
    TraceError(#[from] TraceError),

    #[error("Results file error: {0}")]
    ResultsError(#[from] ResultsError),

    #[error("Coherence violation: {0}")]
    CoherenceError(#[from] CoherenceError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Errors related to instruction trace files
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to read trace file '{0}': {1}")]
    FileReadError(PathBuf, #[source] std::io::Error),

    #[error("Invalid format in '{path}' at line {line}: {reason}")]
    ParseError {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// Errors related to the `KEY VALUE` results file
#[derive(Error, Debug)]
pub enum ResultsError {
    #[error("The results file '{0}' was not found; run compare-eval first")]
    NotFound(PathBuf),

    #[error("Failed to read results file '{0}': {1}")]
    FileReadError(PathBuf, #[source] std::io::Error),

    #[error("Invalid entry at line {line}: {reason}")]
    ParseError { line: usize, reason: String },

    #[error("Missing key: {0}")]
    MissingKey(String),
}

/// Violations found when checking the caches after a run
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoherenceError {
    #[error("Processor {processor} holds state {state} which {protocol} does not define")]
    IllegalState {
        processor: usize,
        state: CacheState,
        protocol: ProtocolKind,
    },

    #[error("Address {address} is Modified in more than one cache: {holders:?}")]
    MultipleModified { address: usize, holders: Vec<usize> },

    #[error("Address {address} is Owned by more than one cache: {holders:?}")]
    MultipleOwned { address: usize, holders: Vec<usize> },
}

/// Type alias for Result with SimulatorError
pub type SimulatorResult<T> = Result<T, SimulatorError>;
