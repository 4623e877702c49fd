//! Predicate trees used as computation parameters

pub mod filters;

pub use filters::{Condition, Filter, FilterValue, Operator};
