#![forbid(unsafe_code)]

pub(super) const INDEXES: &str = r#"

        CREATE UNIQUE INDEX IF NOT EXISTS uq_relation_tuple_living_xid
          ON relation_tuple(namespace, object_id, relation, userset_namespace, userset_object_id, userset_relation)
          WHERE deleted_xid = 9223372036854775807;

        CREATE INDEX IF NOT EXISTS ix_relation_tuple_by_deleted_xid
          ON relation_tuple(deleted_xid);

        CREATE UNIQUE INDEX IF NOT EXISTS uq_namespace_config_living_xid
          ON namespace_config(namespace)
          WHERE deleted_xid = 9223372036854775807;

        CREATE UNIQUE INDEX IF NOT EXISTS uq_caveat_living_xid
          ON caveat(name)
          WHERE deleted_xid = 9223372036854775807;
"#;
