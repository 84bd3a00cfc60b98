//! Impurity criterion engine for decision-tree induction.
//!
//! Implements the abstract [`Criterion`] contract (spec §4.1) and its two
//! concrete families: classification ([`Gini`], [`Entropy`]) over per-output,
//! per-class weighted histograms, and regression ([`Mse`], [`FriedmanMse`],
//! [`Poisson`], [`Huber`], [`Mae`]) over per-output weighted sums (or, for
//! `Mae`, a streaming weighted median). See [`cursor`] for the shared
//! split-boundary bookkeeping every concrete criterion is built on.

pub mod classification;
pub mod cursor;
pub mod error;
pub mod mae;
pub mod regression;

mod criterion;

pub use classification::{ClassCounts, Entropy, Gini};
pub use criterion::Criterion;
pub use mae::Mae;
pub use regression::{FriedmanMse, Huber, HuberDelta, Mse, Poisson};
