//! Shared error types for the arbor workspace.
//!
//! Criterion instances surface only two failure kinds to callers: allocation
//! failure while binding a node's sufficient statistics, and a request for a
//! feature a criterion cannot support (MAE's missing-value handling). Every
//! other situation described by the criterion contract is a total function of
//! well-formed state and never produces an `Error`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to allocate node statistics: {0}")]
    Allocation(String),

    #[error("criterion does not support missing values: {0}")]
    UnsupportedMissing(String),

    #[error("invalid construction parameter: {0}")]
    InvalidParameter(String),
}
