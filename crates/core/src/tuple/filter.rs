#![forbid(unsafe_code)]

use super::types::{ObjectAndRelation, RelationTuple};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FilterClause {
    ObjectId(String),
    Relation(String),
    Userset(ObjectAndRelation),
}

impl FilterClause {
    pub fn matches(&self, tuple: &RelationTuple) -> bool {
        match self {
            Self::ObjectId(object_id) => &tuple.object.object_id == object_id,
            Self::Relation(relation) => &tuple.object.relation == relation,
            Self::Userset(userset) => &tuple.subject == userset,
        }
    }
}

/// Conjunctive filter over the tuples of one namespace.
///
/// Every `with_*` call returns a new filter, so a base filter can be branched
/// into several variants without affecting the others.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TupleFilter {
    namespace: String,
    clauses: Vec<FilterClause>,
}

impl TupleFilter {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            clauses: Vec::new(),
        }
    }

    /// The filter that matches exactly `tuple`.
    pub fn for_tuple(tuple: &RelationTuple) -> Self {
        Self::new(tuple.object.namespace.clone())
            .with_object_id(tuple.object.object_id.clone())
            .with_relation(tuple.object.relation.clone())
            .with_userset(tuple.subject.clone())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn with_object_id(&self, object_id: impl Into<String>) -> Self {
        self.with_clause(FilterClause::ObjectId(object_id.into()))
    }

    pub fn with_relation(&self, relation: impl Into<String>) -> Self {
        self.with_clause(FilterClause::Relation(relation.into()))
    }

    pub fn with_userset(&self, userset: ObjectAndRelation) -> Self {
        self.with_clause(FilterClause::Userset(userset))
    }

    pub fn matches(&self, tuple: &RelationTuple) -> bool {
        tuple.object.namespace == self.namespace
            && self.clauses.iter().all(|clause| clause.matches(tuple))
    }

    fn with_clause(&self, clause: FilterClause) -> Self {
        let mut clauses = self.clauses.clone();
        clauses.push(clause);
        Self {
            namespace: self.namespace.clone(),
            clauses,
        }
    }
}

impl fmt::Display for TupleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "namespace={}", self.namespace)?;
        for clause in &self.clauses {
            match clause {
                FilterClause::ObjectId(object_id) => write!(f, " object_id={object_id}")?,
                FilterClause::Relation(relation) => write!(f, " relation={relation}")?,
                FilterClause::Userset(userset) => write!(f, " userset={userset}")?,
            }
        }
        Ok(())
    }
}
