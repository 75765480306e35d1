#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS schema_version (
          version_num TEXT NOT NULL
        );

        INSERT INTO schema_version(version_num)
          SELECT '' WHERE NOT EXISTS (SELECT 1 FROM schema_version);
"#;
