#![forbid(unsafe_code)]

//! SQLite-backed, revisioned store for relation tuples, namespace definitions
//! and caveat definitions.

mod store;

pub use store::*;
