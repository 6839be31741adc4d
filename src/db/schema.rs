//! Versioned DDL for the post board database.
//! Migrations are applied in ascending `version` order and recorded in
//! `schema_migrations`; a version is never applied twice.

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Bookkeeping table, created before any migration runs.
pub const SCHEMA_MIGRATIONS_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    applied_at TEXT NOT NULL -- RFC3339
)
"#;

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create microposts",
        sql: r#"
CREATE TABLE IF NOT EXISTS microposts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL
);
"#,
    },
    Migration {
        version: 2,
        description: "create images",
        sql: r#"
CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    image_url TEXT NOT NULL, -- server-relative upload URL or client-supplied URL
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#,
    },
];

/// Split a migration body into individual statements; `sqlx::query` runs one at a time.
pub fn statements(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_strictly_increasing() {
        assert!(MIGRATIONS.windows(2).all(|w| w[0].version < w[1].version));
        assert!(MIGRATIONS.first().is_some_and(|m| m.version == 1));
    }

    #[test]
    fn statements_skip_blank_fragments() {
        let sql = "CREATE TABLE a (x INTEGER);\n\n CREATE TABLE b (y TEXT); ";
        let parts: Vec<_> = statements(sql).collect();
        assert_eq!(parts, vec!["CREATE TABLE a (x INTEGER)", "CREATE TABLE b (y TEXT)"]);
    }
}
