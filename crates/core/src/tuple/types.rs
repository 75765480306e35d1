#![forbid(unsafe_code)]

use super::ids::{
    ELLIPSIS, IdentifierError, validate_namespace, validate_object_id, validate_relation,
    validate_subject_relation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `namespace:object_id#relation`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectAndRelation {
    pub namespace: String,
    pub object_id: String,
    pub relation: String,
}

impl ObjectAndRelation {
    pub fn new(
        namespace: impl Into<String>,
        object_id: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            object_id: object_id.into(),
            relation: relation.into(),
        }
    }

    /// A subject reference to the object itself rather than one of its relations.
    pub fn subject(namespace: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self::new(namespace, object_id, ELLIPSIS)
    }

    pub fn is_ellipsis(&self) -> bool {
        self.relation == ELLIPSIS
    }

    fn validate_common(&self) -> Result<(), IdentifierError> {
        validate_namespace(&self.namespace)?;
        validate_object_id(&self.object_id)
    }
}

impl fmt::Display for ObjectAndRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.object_id)?;
        if !self.is_ellipsis() {
            write!(f, "#{}", self.relation)?;
        }
        Ok(())
    }
}

/// A relation tuple: `object#relation@subject`.
///
/// Tuples are immutable facts; the natural key of a stored tuple is the whole value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationTuple {
    pub object: ObjectAndRelation,
    pub subject: ObjectAndRelation,
}

impl RelationTuple {
    pub fn new(object: ObjectAndRelation, subject: ObjectAndRelation) -> Self {
        Self { object, subject }
    }

    pub fn validate(&self) -> Result<(), IdentifierError> {
        self.object.validate_common()?;
        validate_relation(&self.object.relation)?;
        self.subject.validate_common()?;
        validate_subject_relation(&self.subject.relation)
    }
}

impl fmt::Display for RelationTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}#{}@{}",
            self.object.namespace, self.object.object_id, self.object.relation, self.subject
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TupleParseError {
    #[error("tuple `{0}` is missing the `@` subject separator")]
    MissingSubject(String),
    #[error("`{0}` is not of the form namespace:object_id")]
    MissingObjectId(String),
    #[error("`{0}` is missing the `#` relation separator")]
    MissingRelation(String),
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}

impl FromStr for RelationTuple {
    type Err = TupleParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let Some((object, subject)) = value.split_once('@') else {
            return Err(TupleParseError::MissingSubject(value.to_string()));
        };

        let Some((object, relation)) = object.split_once('#') else {
            return Err(TupleParseError::MissingRelation(object.to_string()));
        };
        let (namespace, object_id) = split_object(object)?;

        let (subject, subject_relation) = match subject.split_once('#') {
            Some((subject, relation)) => (subject, relation),
            None => (subject, ELLIPSIS),
        };
        let (subject_namespace, subject_object_id) = split_object(subject)?;

        let tuple = RelationTuple::new(
            ObjectAndRelation::new(namespace, object_id, relation),
            ObjectAndRelation::new(subject_namespace, subject_object_id, subject_relation),
        );
        tuple.validate()?;
        Ok(tuple)
    }
}

fn split_object(value: &str) -> Result<(&str, &str), TupleParseError> {
    value
        .split_once(':')
        .ok_or_else(|| TupleParseError::MissingObjectId(value.to_string()))
}
