#![forbid(unsafe_code)]

mod iterator;
mod query;
mod write;

pub use iterator::TupleIterator;
pub use query::TupleQuery;

pub(in crate::store) use write::{check_preconditions_tx, delete_matching_tx};

const TUPLE_TABLE: &str = "relation_tuple";
