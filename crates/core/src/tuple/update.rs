#![forbid(unsafe_code)]

use super::filter::TupleFilter;
use super::types::RelationTuple;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TupleOperation {
    /// Insert; the tuple must not already be visible.
    Create,
    /// Idempotent upsert: replace any visible row with a fresh one.
    Touch,
    /// Soft delete; deleting an absent tuple is not an error.
    Delete,
}

impl TupleOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Touch => "touch",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for TupleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationTupleUpdate {
    pub operation: TupleOperation,
    pub tuple: RelationTuple,
}

impl RelationTupleUpdate {
    pub fn create(tuple: RelationTuple) -> Self {
        Self {
            operation: TupleOperation::Create,
            tuple,
        }
    }

    pub fn touch(tuple: RelationTuple) -> Self {
        Self {
            operation: TupleOperation::Touch,
            tuple,
        }
    }

    pub fn delete(tuple: RelationTuple) -> Self {
        Self {
            operation: TupleOperation::Delete,
            tuple,
        }
    }
}

/// Requires at least one tuple matching `filter` to be visible when a write starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Precondition {
    filter: TupleFilter,
}

impl Precondition {
    pub fn must_exist(tuple: &RelationTuple) -> Self {
        Self {
            filter: TupleFilter::for_tuple(tuple),
        }
    }

    pub fn must_match(filter: TupleFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &TupleFilter {
        &self.filter
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "must match [{}]", self.filter)
    }
}
