#![forbid(unsafe_code)]

use rusqlite::types::Value as SqlValue;
use tv_core::{FilterClause, ObjectAndRelation, RelationTuple, TupleFilter};

pub(in crate::store) const TUPLE_COLUMNS: &str = "namespace, object_id, relation, \
     userset_namespace, userset_object_id, userset_relation";

/// Appends ` AND ...` for the namespace and every clause of the filter.
pub(in crate::store) fn append_filter_clauses(
    sql: &mut String,
    params: &mut Vec<SqlValue>,
    filter: &TupleFilter,
) {
    sql.push_str(" AND namespace = ?");
    params.push(SqlValue::Text(filter.namespace().to_string()));
    for clause in filter.clauses() {
        match clause {
            FilterClause::ObjectId(object_id) => {
                sql.push_str(" AND object_id = ?");
                params.push(SqlValue::Text(object_id.clone()));
            }
            FilterClause::Relation(relation) => {
                sql.push_str(" AND relation = ?");
                params.push(SqlValue::Text(relation.clone()));
            }
            FilterClause::Userset(userset) => {
                sql.push_str(
                    " AND userset_namespace = ? AND userset_object_id = ? AND userset_relation = ?",
                );
                params.push(SqlValue::Text(userset.namespace.clone()));
                params.push(SqlValue::Text(userset.object_id.clone()));
                params.push(SqlValue::Text(userset.relation.clone()));
            }
        }
    }
}

/// Natural key of a tuple row, in `TUPLE_COLUMNS` order.
pub(in crate::store) fn tuple_key(tuple: &RelationTuple) -> [(&'static str, SqlValue); 6] {
    [
        ("namespace", SqlValue::Text(tuple.object.namespace.clone())),
        ("object_id", SqlValue::Text(tuple.object.object_id.clone())),
        ("relation", SqlValue::Text(tuple.object.relation.clone())),
        (
            "userset_namespace",
            SqlValue::Text(tuple.subject.namespace.clone()),
        ),
        (
            "userset_object_id",
            SqlValue::Text(tuple.subject.object_id.clone()),
        ),
        (
            "userset_relation",
            SqlValue::Text(tuple.subject.relation.clone()),
        ),
    ]
}

pub(in crate::store) fn tuple_from_row(
    row: &rusqlite::Row<'_>,
    offset: usize,
) -> rusqlite::Result<RelationTuple> {
    Ok(RelationTuple::new(
        ObjectAndRelation::new(
            row.get::<_, String>(offset)?,
            row.get::<_, String>(offset + 1)?,
            row.get::<_, String>(offset + 2)?,
        ),
        ObjectAndRelation::new(
            row.get::<_, String>(offset + 3)?,
            row.get::<_, String>(offset + 4)?,
            row.get::<_, String>(offset + 5)?,
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clauses_compile_in_order() {
        let filter = TupleFilter::new("document")
            .with_object_id("1")
            .with_userset(ObjectAndRelation::subject("user", "alice"))
            .with_relation("viewer");
        let mut sql = String::new();
        let mut params = Vec::new();
        append_filter_clauses(&mut sql, &mut params, &filter);
        assert_eq!(
            sql,
            " AND namespace = ? AND object_id = ? AND userset_namespace = ? \
             AND userset_object_id = ? AND userset_relation = ? AND relation = ?"
        );
        let texts: Vec<String> = params
            .into_iter()
            .map(|value| match value {
                SqlValue::Text(text) => text,
                other => panic!("unexpected param {other:?}"),
            })
            .collect();
        assert_eq!(
            texts,
            ["document", "1", "user", "alice", "...", "viewer"].map(String::from)
        );
    }

    #[test]
    fn bare_filter_only_scopes_namespace() {
        let mut sql = String::new();
        let mut params = Vec::new();
        append_filter_clauses(&mut sql, &mut params, &TupleFilter::new("folder"));
        assert_eq!(sql, " AND namespace = ?");
        assert_eq!(params.len(), 1);
    }
}
