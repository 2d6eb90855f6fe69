//! Shared traits for the qdataset ecosystem.
//!
//! This crate provides the definitions every dataset implementation and
//! every consumer agrees on:
//!
//! - [`QDataSet`]: the read-only capability contract (rank, lengths, values,
//!   properties) plus optional capability queries
//! - [`WritableDataSet`], [`MutablePropertyDataSet`], [`Appendable`]:
//!   capabilities reachable through `&mut` access only
//! - [`PropertyValue`] / [`ValueKind`]: the weakly-typed property payload
//! - [`names`]: the fixed property vocabulary (`DEPEND_0`, `UNITS`, ...)
//! - [`DataSetError`]: the error taxonomy shared by all crates
//! - [`config`]: the process-wide range-checking toggle
//!
//! Implementations live in `qdataset-view`; the cache in `qdataset-cache`
//! depends only on this crate.

pub mod config;
mod dataset;
mod error;
pub mod names;
mod units;
mod value;

pub use dataset::{
    check_indices, describe, Appendable, DataSetRef, MutablePropertyDataSet, QDataSet,
    WritableDataSet,
};
pub use error::{DataSetError, Result};
pub use units::Units;
pub use value::{PropertyMap, PropertyValue, ValueKind};

/// Highest rank any dataset may have.
pub const MAX_RANK: usize = 4;
