#![forbid(unsafe_code)]

//! Schema-level definitions persisted by the datastore as opaque blobs.
//!
//! The store only ever sees `(name, bytes)`; encoding and decoding belong to
//! the definition types here.

use crate::tuple::{IdentifierError, validate_namespace, validate_relation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("definition name must not be empty")]
    EmptyName,
    #[error("invalid definition name: {0}")]
    InvalidName(#[from] IdentifierError),
    #[error("unable to encode definition: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("unable to decode definition: {0}")]
    Decode(#[source] serde_json::Error),
}

pub trait Definition: Sized {
    /// Human readable kind, used in logs and errors.
    const KIND: &'static str;

    fn name(&self) -> &str;

    fn validate(&self) -> Result<(), DefinitionError>;

    fn encode(&self) -> Result<Vec<u8>, DefinitionError>;

    fn decode(bytes: &[u8]) -> Result<Self, DefinitionError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaveatDefinition {
    pub name: String,
    pub expression: String,
    /// Parameter name to declared type.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl CaveatDefinition {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, kind: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), kind.into());
        self
    }
}

impl Definition for CaveatDefinition {
    const KIND: &'static str = "caveat";

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        Ok(())
    }

    fn encode(&self) -> Result<Vec<u8>, DefinitionError> {
        serde_json::to_vec(self).map_err(DefinitionError::Encode)
    }

    fn decode(bytes: &[u8]) -> Result<Self, DefinitionError> {
        serde_json::from_slice(bytes).map_err(DefinitionError::Decode)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    pub name: String,
    /// Userset rewrite in the schema language, if the relation is computed.
    #[serde(default)]
    pub rewrite: Option<String>,
    #[serde(default)]
    pub allowed_subjects: Vec<String>,
}

impl RelationDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rewrite: None,
            allowed_subjects: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDefinition {
    pub name: String,
    #[serde(default)]
    pub relations: Vec<RelationDefinition>,
}

impl NamespaceDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relations: Vec::new(),
        }
    }

    pub fn with_relation(mut self, relation: RelationDefinition) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDefinition> {
        self.relations.iter().find(|relation| relation.name == name)
    }
}

impl Definition for NamespaceDefinition {
    const KIND: &'static str = "namespace";

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        validate_namespace(&self.name)?;
        for relation in &self.relations {
            validate_relation(&relation.name)?;
        }
        Ok(())
    }

    fn encode(&self) -> Result<Vec<u8>, DefinitionError> {
        serde_json::to_vec(self).map_err(DefinitionError::Encode)
    }

    fn decode(bytes: &[u8]) -> Result<Self, DefinitionError> {
        serde_json::from_slice(bytes).map_err(DefinitionError::Decode)
    }
}
