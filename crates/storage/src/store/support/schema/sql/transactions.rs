#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        -- One row per committed write; `id` is the revision.
        CREATE TABLE IF NOT EXISTS relation_tuple_transaction (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          timestamp_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS ix_relation_tuple_transaction_by_timestamp
          ON relation_tuple_transaction(timestamp_ms);
"#;
