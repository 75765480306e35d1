#![forbid(unsafe_code)]

use super::support::{
    NAMESPACE_TABLE, delete_definitions_tx, list_definitions_tx, read_definition_tx,
    write_definitions_tx,
};
use super::tuples::delete_matching_tx;
use super::{Cx, SnapshotReader, SqliteStore, StoreError};
use tracing::{debug, info};
use tv_core::{Definition, NamespaceDefinition, Revision, TupleFilter};

impl SqliteStore {
    pub fn write_namespace(
        &mut self,
        cx: &Cx,
        namespace: &NamespaceDefinition,
    ) -> Result<Revision, StoreError> {
        namespace.validate().map_err(|err| {
            StoreError::InvalidInput(format!("namespace `{}`: {err}", namespace.name))
        })?;
        let phase = self.config.migration_phase;
        let (revision, ()) = self.write_with(cx, "write namespace", &[], |tx, revision| {
            write_definitions_tx(
                tx,
                NAMESPACE_TABLE,
                phase,
                revision,
                std::slice::from_ref(namespace),
            )
        })?;
        debug!(revision = %revision, namespace = %namespace.name, "wrote namespace");
        Ok(revision)
    }

    /// Removes the definition and soft-deletes every tuple in the namespace.
    pub fn delete_namespace(&mut self, cx: &Cx, name: &str) -> Result<Revision, StoreError> {
        let phase = self.config.migration_phase;
        let (revision, tuples) = self.write_with(cx, "delete namespace", &[], |tx, revision| {
            let removed = delete_definitions_tx(tx, NAMESPACE_TABLE, phase, revision, &[name])?;
            if removed == 0 {
                return Err(StoreError::NamespaceNotFound(name.to_string()));
            }
            delete_matching_tx(tx, phase, revision, &TupleFilter::new(name))
        })?;
        info!(revision = %revision, namespace = name, tuples, "deleted namespace");
        Ok(revision)
    }

    /// The namespace visible at head and the revision that wrote it.
    pub fn read_namespace(
        &self,
        cx: &Cx,
        name: &str,
    ) -> Result<(NamespaceDefinition, Revision), StoreError> {
        read_namespace(self, cx, None, name)
    }

    /// Namespaces visible at head, ordered by name.
    pub fn list_namespaces(&self, cx: &Cx) -> Result<Vec<NamespaceDefinition>, StoreError> {
        list_namespaces(self, cx, None)
    }
}

impl SnapshotReader<'_> {
    pub fn read_namespace(
        &self,
        cx: &Cx,
        name: &str,
    ) -> Result<(NamespaceDefinition, Revision), StoreError> {
        read_namespace(self.store, cx, Some(self.revision), name)
    }

    pub fn list_namespaces(&self, cx: &Cx) -> Result<Vec<NamespaceDefinition>, StoreError> {
        list_namespaces(self.store, cx, Some(self.revision))
    }
}

fn read_namespace(
    store: &SqliteStore,
    cx: &Cx,
    pinned: Option<Revision>,
    name: &str,
) -> Result<(NamespaceDefinition, Revision), StoreError> {
    let result = (|| {
        let (scope, revision) = store.begin_read(cx, pinned)?;
        let found = read_definition_tx::<NamespaceDefinition>(
            &scope,
            NAMESPACE_TABLE,
            store.config.migration_phase,
            revision,
            name,
        )?;
        scope.finish()?;
        Ok::<_, StoreError>(found)
    })();
    result
        .map_err(|err| err.during("read namespace"))?
        .ok_or_else(|| StoreError::NamespaceNotFound(name.to_string()))
}

fn list_namespaces(
    store: &SqliteStore,
    cx: &Cx,
    pinned: Option<Revision>,
) -> Result<Vec<NamespaceDefinition>, StoreError> {
    let result = (|| {
        let (scope, revision) = store.begin_read(cx, pinned)?;
        let namespaces = list_definitions_tx::<NamespaceDefinition>(
            &scope,
            NAMESPACE_TABLE,
            store.config.migration_phase,
            revision,
            &[],
        )?;
        scope.finish()?;
        Ok::<_, StoreError>(namespaces)
    })();
    result.map_err(|err| err.during("list namespaces"))
}
