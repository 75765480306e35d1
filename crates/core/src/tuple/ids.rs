#![forbid(unsafe_code)]

pub const ELLIPSIS: &str = "...";

const MAX_SEGMENT_LEN: usize = 64;
const MAX_OBJECT_ID_LEN: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentifierKind {
    Namespace,
    ObjectId,
    Relation,
}

impl IdentifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Namespace => "namespace",
            Self::ObjectId => "object id",
            Self::Relation => "relation",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("{} must not be empty", .0.as_str())]
    Empty(IdentifierKind),
    #[error("{} is too short", .0.as_str())]
    TooShort(IdentifierKind),
    #[error("{} is too long", .0.as_str())]
    TooLong(IdentifierKind),
    #[error("{} `{value}` has an invalid first character", .kind.as_str())]
    InvalidFirstChar { kind: IdentifierKind, value: String },
    #[error("{} `{value}` has an invalid last character", .kind.as_str())]
    InvalidLastChar { kind: IdentifierKind, value: String },
    #[error("{} `{value}` contains invalid character {ch:?} at {index}", .kind.as_str())]
    InvalidChar {
        kind: IdentifierKind,
        value: String,
        ch: char,
        index: usize,
    },
}

impl IdentifierError {
    pub fn kind(&self) -> IdentifierKind {
        match self {
            Self::Empty(kind) | Self::TooShort(kind) | Self::TooLong(kind) => *kind,
            Self::InvalidFirstChar { kind, .. }
            | Self::InvalidLastChar { kind, .. }
            | Self::InvalidChar { kind, .. } => *kind,
        }
    }
}

/// Namespaces are `name` or `prefix/name`, each segment lowercase snake case.
pub fn validate_namespace(value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty(IdentifierKind::Namespace));
    }
    let mut segments = value.splitn(2, '/');
    let first = segments.next().unwrap_or_default();
    validate_segment(IdentifierKind::Namespace, value, first)?;
    if let Some(rest) = segments.next() {
        validate_segment(IdentifierKind::Namespace, value, rest)?;
    }
    Ok(())
}

pub fn validate_relation(value: &str) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty(IdentifierKind::Relation));
    }
    validate_segment(IdentifierKind::Relation, value, value)
}

/// Same as [`validate_relation`] but also accepts the `...` subject marker.
pub fn validate_subject_relation(value: &str) -> Result<(), IdentifierError> {
    if value == ELLIPSIS {
        return Ok(());
    }
    validate_relation(value)
}

pub fn validate_object_id(value: &str) -> Result<(), IdentifierError> {
    let kind = IdentifierKind::ObjectId;
    if value.is_empty() {
        return Err(IdentifierError::Empty(kind));
    }
    if value.len() > MAX_OBJECT_ID_LEN {
        return Err(IdentifierError::TooLong(kind));
    }
    for (index, ch) in value.chars().enumerate() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '/' | '_' | '|' | '-' | '=' | '+') {
            continue;
        }
        return Err(IdentifierError::InvalidChar {
            kind,
            value: value.to_string(),
            ch,
            index,
        });
    }
    Ok(())
}

fn validate_segment(kind: IdentifierKind, full: &str, segment: &str) -> Result<(), IdentifierError> {
    if segment.is_empty() {
        return Err(IdentifierError::Empty(kind));
    }
    if segment.len() > MAX_SEGMENT_LEN {
        return Err(IdentifierError::TooLong(kind));
    }
    let mut chars = segment.chars();
    let Some(first) = chars.next() else {
        return Err(IdentifierError::Empty(kind));
    };
    if !first.is_ascii_lowercase() {
        return Err(IdentifierError::InvalidFirstChar {
            kind,
            value: full.to_string(),
        });
    }
    for (index, ch) in segment.chars().enumerate() {
        if index == 0 {
            continue;
        }
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            continue;
        }
        return Err(IdentifierError::InvalidChar {
            kind,
            value: full.to_string(),
            ch,
            index,
        });
    }
    if segment.len() < 2 {
        return Err(IdentifierError::TooShort(kind));
    }
    if segment.ends_with('_') {
        return Err(IdentifierError::InvalidLastChar {
            kind,
            value: full.to_string(),
        });
    }
    Ok(())
}
