#![forbid(unsafe_code)]

mod definitions;
mod marker;
mod transactions;
mod tuples;
mod xid;

/// DDL of the `initial` migration.
pub(super) fn initial_schema_sql() -> String {
    let mut sql = String::new();
    sql.push_str(marker::SQL);
    sql.push_str(transactions::SQL);
    sql.push_str(tuples::SQL);
    sql.push_str(definitions::SQL);
    sql
}

/// Indexes of the `add-xid-columns` migration; the columns themselves are
/// added one at a time so a partially applied run can resume.
pub(super) fn xid_indexes_sql() -> &'static str {
    xid::INDEXES
}

pub(super) const VERSIONED_TABLES: [&str; 3] = ["relation_tuple", "namespace_config", "caveat"];
