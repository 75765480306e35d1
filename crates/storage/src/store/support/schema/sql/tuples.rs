#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS relation_tuple (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          namespace TEXT NOT NULL,
          object_id TEXT NOT NULL,
          relation TEXT NOT NULL,
          userset_namespace TEXT NOT NULL,
          userset_object_id TEXT NOT NULL,
          userset_relation TEXT NOT NULL,
          created_transaction INTEGER,
          deleted_transaction INTEGER
        );

        CREATE UNIQUE INDEX IF NOT EXISTS uq_relation_tuple_living
          ON relation_tuple(namespace, object_id, relation, userset_namespace, userset_object_id, userset_relation)
          WHERE deleted_transaction = 9223372036854775807;

        CREATE INDEX IF NOT EXISTS ix_relation_tuple_by_subject
          ON relation_tuple(userset_namespace, userset_object_id, userset_relation);

        CREATE INDEX IF NOT EXISTS ix_relation_tuple_by_deleted_transaction
          ON relation_tuple(deleted_transaction);
"#;
