#![forbid(unsafe_code)]

mod clauses;
mod definitions;
mod interrupt;
mod read_scope;
mod rows;
mod schema;
mod versioning;

pub(super) use clauses::*;
pub(super) use definitions::*;
pub(super) use interrupt::{InterruptGuard, begin_immediate};
pub(super) use read_scope::ReadScope;
pub(super) use rows::*;
pub(super) use schema::{HEAD_VERSION, is_known_version, migrate_sqlite_schema};
pub(super) use versioning::*;
