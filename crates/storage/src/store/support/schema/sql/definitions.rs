#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS namespace_config (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          namespace TEXT NOT NULL,
          serialized_config BLOB NOT NULL,
          created_transaction INTEGER,
          deleted_transaction INTEGER
        );

        CREATE UNIQUE INDEX IF NOT EXISTS uq_namespace_config_living
          ON namespace_config(namespace)
          WHERE deleted_transaction = 9223372036854775807;

        CREATE TABLE IF NOT EXISTS caveat (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL,
          definition BLOB NOT NULL,
          created_transaction INTEGER,
          deleted_transaction INTEGER
        );

        CREATE UNIQUE INDEX IF NOT EXISTS uq_caveat_living
          ON caveat(name)
          WHERE deleted_transaction = 9223372036854775807;
"#;
