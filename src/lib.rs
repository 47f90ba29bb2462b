//! Data access core of a personal tracking application on Postgres.
//!
//! SQL is written with named `:placeholders`. Values are expanded into the statement
//! (arrays, composites, enums and dynamic payloads), results are converted back through a
//! [`TypeRegistry`] and multi statement work is described as a [`TransactionPlan`] whose
//! steps can reference the results of the ones before them.
pub use trove_core::*;
pub use trove_macros::*;
