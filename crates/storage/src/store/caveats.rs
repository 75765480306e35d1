#![forbid(unsafe_code)]

use super::support::{
    CAVEAT_TABLE, delete_definitions_tx, list_definitions_tx, read_definition_tx,
    write_definitions_tx,
};
use super::{Cx, SnapshotReader, SqliteStore, StoreError};
use std::collections::HashSet;
use tracing::debug;
use tv_core::{CaveatDefinition, Definition, Revision};

impl SqliteStore {
    /// Stores each caveat at a new revision, superseding any visible
    /// definition with the same name.
    pub fn write_caveats(
        &mut self,
        cx: &Cx,
        caveats: &[CaveatDefinition],
    ) -> Result<Revision, StoreError> {
        let mut names = HashSet::with_capacity(caveats.len());
        for caveat in caveats {
            caveat
                .validate()
                .map_err(|err| StoreError::InvalidInput(format!("caveat `{}`: {err}", caveat.name)))?;
            if !names.insert(caveat.name.as_str()) {
                return Err(StoreError::InvalidInput(format!(
                    "caveat `{}` written twice in one call",
                    caveat.name
                )));
            }
        }

        let phase = self.config.migration_phase;
        let (revision, ()) = self.write_with(cx, "write caveats", &[], |tx, revision| {
            write_definitions_tx(tx, CAVEAT_TABLE, phase, revision, caveats)
        })?;
        debug!(revision = %revision, caveats = caveats.len(), "wrote caveats");
        Ok(revision)
    }

    /// Soft-deletes the named caveats. Unknown names are ignored.
    pub fn delete_caveats(&mut self, cx: &Cx, names: &[&str]) -> Result<Revision, StoreError> {
        let phase = self.config.migration_phase;
        let (revision, deleted) = self.write_with(cx, "delete caveats", &[], |tx, revision| {
            delete_definitions_tx(tx, CAVEAT_TABLE, phase, revision, names)
        })?;
        debug!(revision = %revision, requested = names.len(), deleted, "deleted caveats");
        Ok(revision)
    }

    /// The caveat visible at head and the revision that wrote it.
    pub fn read_caveat_by_name(
        &self,
        cx: &Cx,
        name: &str,
    ) -> Result<(CaveatDefinition, Revision), StoreError> {
        read_caveat(self, cx, None, name)
    }

    /// Caveats visible at head, ordered by name. No names means all of them.
    pub fn list_caveats(&self, cx: &Cx, names: &[&str]) -> Result<Vec<CaveatDefinition>, StoreError> {
        list_caveats(self, cx, None, names)
    }
}

impl SnapshotReader<'_> {
    pub fn read_caveat_by_name(
        &self,
        cx: &Cx,
        name: &str,
    ) -> Result<(CaveatDefinition, Revision), StoreError> {
        read_caveat(self.store, cx, Some(self.revision), name)
    }

    pub fn list_caveats(&self, cx: &Cx, names: &[&str]) -> Result<Vec<CaveatDefinition>, StoreError> {
        list_caveats(self.store, cx, Some(self.revision), names)
    }
}

fn read_caveat(
    store: &SqliteStore,
    cx: &Cx,
    pinned: Option<Revision>,
    name: &str,
) -> Result<(CaveatDefinition, Revision), StoreError> {
    let result = (|| {
        let (scope, revision) = store.begin_read(cx, pinned)?;
        let found = read_definition_tx::<CaveatDefinition>(
            &scope,
            CAVEAT_TABLE,
            store.config.migration_phase,
            revision,
            name,
        )?;
        scope.finish()?;
        Ok::<_, StoreError>(found)
    })();
    result
        .map_err(|err| err.during("read caveat"))?
        .ok_or_else(|| StoreError::CaveatNotFound(name.to_string()))
}

fn list_caveats(
    store: &SqliteStore,
    cx: &Cx,
    pinned: Option<Revision>,
    names: &[&str],
) -> Result<Vec<CaveatDefinition>, StoreError> {
    let result = (|| {
        let (scope, revision) = store.begin_read(cx, pinned)?;
        let caveats = list_definitions_tx::<CaveatDefinition>(
            &scope,
            CAVEAT_TABLE,
            store.config.migration_phase,
            revision,
            names,
        )?;
        scope.finish()?;
        Ok::<_, StoreError>(caveats)
    })();
    result.map_err(|err| err.during("list caveats"))
}
