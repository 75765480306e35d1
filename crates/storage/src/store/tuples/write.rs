#![forbid(unsafe_code)]

use super::super::error::is_constraint_violation;
use super::super::support::{
    append_filter_clauses, append_live_clause, insert_versioned_row_tx, soft_delete_by_key_tx,
    soft_delete_where_tx, tuple_key,
};
use super::super::{Cx, SqliteStore, StoreError};
use super::TUPLE_TABLE;
use rusqlite::{Connection, OptionalExtension, Transaction, params_from_iter};
use std::collections::HashSet;
use tracing::debug;
use tv_core::{
    MigrationPhase, Precondition, RelationTupleUpdate, Revision, TupleFilter, TupleOperation,
    validate_namespace,
};

impl SqliteStore {
    /// Applies `mutations` atomically at a new revision, provided every
    /// precondition holds at the current head.
    ///
    /// `Create` on a key that is already visible fails the whole call with
    /// [`StoreError::TupleAlreadyExists`]; use `Touch` for upserts. Deleting an
    /// absent tuple is not an error.
    pub fn write_tuples(
        &mut self,
        cx: &Cx,
        preconditions: &[Precondition],
        mutations: &[RelationTupleUpdate],
    ) -> Result<Revision, StoreError> {
        validate_mutations(mutations)?;
        let phase = self.config.migration_phase;
        let (revision, ()) =
            self.write_with(cx, "write tuples", preconditions, |tx, revision| {
                for mutation in mutations {
                    cx.checkpoint()?;
                    apply_mutation_tx(tx, phase, revision, mutation)?;
                }
                Ok(())
            })?;
        debug!(
            revision = %revision,
            mutations = mutations.len(),
            preconditions = preconditions.len(),
            "wrote tuples"
        );
        Ok(revision)
    }

    /// Soft-deletes every tuple visible at head that matches `filter`.
    pub fn delete_tuples(
        &mut self,
        cx: &Cx,
        preconditions: &[Precondition],
        filter: &TupleFilter,
    ) -> Result<(Revision, usize), StoreError> {
        validate_namespace(filter.namespace())
            .map_err(|err| StoreError::InvalidInput(err.to_string()))?;
        let phase = self.config.migration_phase;
        let (revision, deleted) =
            self.write_with(cx, "delete tuples", preconditions, |tx, revision| {
                delete_matching_tx(tx, phase, revision, filter)
            })?;
        debug!(revision = %revision, filter = %filter, deleted, "deleted tuples");
        Ok((revision, deleted))
    }
}

fn validate_mutations(mutations: &[RelationTupleUpdate]) -> Result<(), StoreError> {
    let mut seen = HashSet::with_capacity(mutations.len());
    for mutation in mutations {
        mutation
            .tuple
            .validate()
            .map_err(|err| StoreError::InvalidInput(format!("{}: {err}", mutation.tuple)))?;
        if !seen.insert(&mutation.tuple) {
            return Err(StoreError::InvalidInput(format!(
                "duplicate update for {} in one write",
                mutation.tuple
            )));
        }
    }
    Ok(())
}

fn apply_mutation_tx(
    tx: &Transaction<'_>,
    phase: MigrationPhase,
    revision: Revision,
    mutation: &RelationTupleUpdate,
) -> Result<(), StoreError> {
    let key = tuple_key(&mutation.tuple);
    match mutation.operation {
        TupleOperation::Create => {
            insert_versioned_row_tx(tx, TUPLE_TABLE, &key, phase, revision).map_err(|err| {
                if is_constraint_violation(&err) {
                    StoreError::TupleAlreadyExists(mutation.tuple.to_string())
                } else {
                    StoreError::from(err)
                }
            })?;
        }
        TupleOperation::Touch => {
            soft_delete_by_key_tx(tx, TUPLE_TABLE, &key, phase, revision)?;
            insert_versioned_row_tx(tx, TUPLE_TABLE, &key, phase, revision)?;
        }
        TupleOperation::Delete => {
            soft_delete_by_key_tx(tx, TUPLE_TABLE, &key, phase, revision)?;
        }
    }
    Ok(())
}

pub(in crate::store) fn delete_matching_tx(
    tx: &Transaction<'_>,
    phase: MigrationPhase,
    revision: Revision,
    filter: &TupleFilter,
) -> Result<usize, StoreError> {
    let mut where_sql = String::new();
    let mut where_params = Vec::new();
    append_filter_clauses(&mut where_sql, &mut where_params, filter);
    Ok(soft_delete_where_tx(
        tx,
        TUPLE_TABLE,
        &where_sql,
        where_params,
        phase,
        revision,
    )?)
}

/// Every precondition must match a live tuple. Runs inside the write
/// transaction, so "live" is exactly what head shows.
pub(in crate::store) fn check_preconditions_tx(
    conn: &Connection,
    phase: MigrationPhase,
    preconditions: &[Precondition],
) -> Result<(), StoreError> {
    for precondition in preconditions {
        let mut sql = format!("SELECT 1 FROM {TUPLE_TABLE} WHERE ");
        let mut params = Vec::new();
        append_live_clause(&mut sql, &mut params, phase);
        append_filter_clauses(&mut sql, &mut params, precondition.filter());
        sql.push_str(" LIMIT 1");
        let found = conn
            .query_row(&sql, params_from_iter(params.iter()), |_| Ok(()))
            .optional()?;
        if found.is_none() {
            return Err(StoreError::PreconditionFailed(precondition.to_string()));
        }
    }
    Ok(())
}
