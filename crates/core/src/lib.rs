#![forbid(unsafe_code)]

//! Backend-independent model of the tuple store: relation tuples, filters,
//! write updates, revisions, the column migration phase and the definitions
//! stored next to tuples.

pub mod definitions;
pub mod phase;
pub mod revision;
pub mod tuple;

pub use definitions::{
    CaveatDefinition, Definition, DefinitionError, NamespaceDefinition, RelationDefinition,
};
pub use phase::{MigrationPhase, PhaseParseError};
pub use revision::Revision;
pub use tuple::{
    ELLIPSIS, FilterClause, IdentifierError, IdentifierKind, ObjectAndRelation, Precondition,
    RelationTuple, RelationTupleUpdate, TupleFilter, TupleOperation, TupleParseError,
    validate_namespace, validate_object_id, validate_relation, validate_subject_relation,
};
