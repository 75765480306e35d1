#![forbid(unsafe_code)]

use rusqlite::ErrorCode;
use std::fmt;
use tv_core::{DefinitionError, Revision};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevisionProblem {
    /// Older than the garbage-collection floor.
    Expired,
    /// Newer than the newest committed transaction, or nothing committed yet.
    Unknown,
}

impl fmt::Display for RevisionProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => f.write_str("expired"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Coarse class of a backend failure, enough to decide whether to retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    /// Another connection held the lock for the whole wait budget.
    Busy,
    Constraint,
    /// The statement was interrupted by its cancellation context.
    Interrupted,
    Other,
}

/// Backend failure detail. Only reachable through [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct BackendError(rusqlite::Error);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("{op}: sqlite: {source}")]
    Storage {
        op: &'static str,
        kind: StorageKind,
        #[source]
        source: BackendError,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("unable to find namespace `{0}`")]
    NamespaceNotFound(String),
    #[error("unable to find caveat `{0}`")]
    CaveatNotFound(String),
    #[error("unable to satisfy write precondition ({0})")]
    PreconditionFailed(String),
    #[error("invalid revision {revision} ({problem})")]
    InvalidRevision {
        revision: Revision,
        problem: RevisionProblem,
    },
    #[error("tuple already exists: {0}")]
    TupleAlreadyExists(String),
    #[error("corrupt {kind} definition `{name}`: {source}")]
    CorruptDefinition {
        kind: &'static str,
        name: String,
        #[source]
        source: DefinitionError,
    },
    #[error("schema version update affected {affected} rows (expected previous `{expected}`)")]
    VersionConflict { expected: String, affected: usize },
    #[error("unsupported schema version `{0}`")]
    UnsupportedSchemaVersion(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO",
            Self::Storage { .. } => "STORAGE",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::NamespaceNotFound(_) => "NAMESPACE_NOT_FOUND",
            Self::CaveatNotFound(_) => "CAVEAT_NOT_FOUND",
            Self::PreconditionFailed(_) => "PRECONDITION_FAILED",
            Self::InvalidRevision { .. } => "INVALID_REVISION",
            Self::TupleAlreadyExists(_) => "ALREADY_EXISTS",
            Self::CorruptDefinition { .. } => "CORRUPT_DEFINITION",
            Self::VersionConflict { .. } => "VERSION_CONFLICT",
            Self::UnsupportedSchemaVersion(_) => "RESET_REQUIRED",
            Self::Cancelled => "CANCELLED",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
        }
    }

    /// Busy/locked backend failures: the transaction never committed and the
    /// caller may retry if the operation is idempotent.
    pub fn is_transient(&self) -> bool {
        self.storage_kind() == Some(StorageKind::Busy)
    }

    pub fn storage_kind(&self) -> Option<StorageKind> {
        match self {
            Self::Storage { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Names the public operation on a backend error; other kinds pass through.
    pub(crate) fn during(self, op: &'static str) -> Self {
        match self {
            Self::Storage { kind, source, .. } => Self::Storage { op, kind, source },
            other => other,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage {
            op: "sqlite",
            kind: classify(&value),
            source: BackendError(value),
        }
    }
}

fn classify(err: &rusqlite::Error) -> StorageKind {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => match code.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => StorageKind::Busy,
            ErrorCode::OperationInterrupted => StorageKind::Interrupted,
            _ if is_constraint_violation(err) => StorageKind::Constraint,
            _ => StorageKind::Other,
        },
        _ => StorageKind::Other,
    }
}

pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                || message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("PRIMARY KEY constraint failed")
                })
        }
        _ => false,
    }
}
