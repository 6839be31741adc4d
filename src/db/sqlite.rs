use crate::db::models::{Image, Micropost, NewImage, NewMicropost};
use crate::db::schema::{MIGRATIONS, Migration, SCHEMA_MIGRATIONS_INIT, statements};
use crate::error::ApiError;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub type SqlitePool = Pool<Sqlite>;

const MAX_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle over the SQLite pool. Cloning is cheap; SQLite serializes writers.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open (creating if missing) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, ApiError> {
        info!(path = %path.display(), "opening sqlite database");

        let connect_opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(connect_opts)
            .await?;

        info!(path = %path.display(), "sqlite database ready");
        Ok(Self::new(pool))
    }

    /// Apply every pending migration, each in its own transaction.
    /// Returns the versions applied by this call (empty when already current).
    pub async fn migrate(&self) -> Result<Vec<i64>, ApiError> {
        sqlx::query(SCHEMA_MIGRATIONS_INIT)
            .execute(&self.pool)
            .await?;

        let applied: HashSet<i64> = sqlx::query_as::<_, (i64,)>("SELECT version FROM schema_migrations")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|(v,)| v)
            .collect();

        let mut newly_applied = Vec::new();
        for migration in MIGRATIONS.iter().filter(|m| !applied.contains(&m.version)) {
            self.apply(migration)
                .await
                .map_err(|source| ApiError::Migration {
                    version: migration.version,
                    source,
                })?;
            info!(
                version = migration.version,
                description = migration.description,
                "applied migration"
            );
            newly_applied.push(migration.version);
        }

        if newly_applied.is_empty() {
            debug!("schema already up to date");
        }
        Ok(newly_applied)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for stmt in statements(migration.sql) {
            sqlx::query(stmt).execute(&mut *tx).await?;
        }
        sqlx::query(
            "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?, ?, ?)",
        )
        .bind(migration.version)
        .bind(migration.description)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await
    }

    /// Highest applied migration version, 0 for a fresh database. Requires `migrate` to have run once.
    pub async fn schema_version(&self) -> Result<i64, ApiError> {
        let rec: (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;
        Ok(rec.0)
    }

    pub async fn insert_image(&self, image: NewImage) -> Result<Image, ApiError> {
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query_as::<_, Image>(
            r#"INSERT INTO images (title, image_url, created_at, updated_at)
               VALUES (?, ?, ?, ?)
               RETURNING id, title, image_url, created_at, updated_at"#,
        )
        .bind(image.title)
        .bind(image.image_url)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_images(&self) -> Result<Vec<Image>, ApiError> {
        let rows = sqlx::query_as::<_, Image>(
            "SELECT id, title, image_url, created_at, updated_at FROM images ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert_micropost(&self, post: NewMicropost) -> Result<Micropost, ApiError> {
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query_as::<_, Micropost>(
            r#"INSERT INTO microposts (content, created_at, updated_at)
               VALUES (?, ?, ?)
               RETURNING id, content, created_at, updated_at"#,
        )
        .bind(post.content)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list_microposts(&self) -> Result<Vec<Micropost>, ApiError> {
        let rows = sqlx::query_as::<_, Micropost>(
            "SELECT id, content, created_at, updated_at FROM microposts ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(&dir.path().join("test.db"))
            .await
            .expect("open storage");
        (dir, storage)
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let (_dir, storage) = temp_storage().await;

        let first = storage.migrate().await.expect("first migrate");
        assert_eq!(first, vec![1, 2]);
        let second = storage.migrate().await.expect("second migrate");
        assert!(second.is_empty());
        assert_eq!(storage.schema_version().await.expect("version"), 2);
    }

    #[tokio::test]
    async fn inserts_come_back_in_id_order() {
        let (_dir, storage) = temp_storage().await;
        storage.migrate().await.expect("migrate");

        let a = storage
            .insert_micropost(NewMicropost {
                content: "first".into(),
            })
            .await
            .expect("insert a");
        let b = storage
            .insert_micropost(NewMicropost {
                content: "second".into(),
            })
            .await
            .expect("insert b");
        assert!(a.id < b.id);

        let listed = storage.list_microposts().await.expect("list");
        assert_eq!(listed, vec![a, b]);
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("durable.db");

        let storage = Storage::open(&path).await.expect("open");
        storage.migrate().await.expect("migrate");
        let created = storage
            .insert_image(NewImage::new(Some("cat".into()), "/upload/x_cat.png"))
            .await
            .expect("insert");
        storage.pool().close().await;

        let reopened = Storage::open(&path).await.expect("reopen");
        assert!(reopened.migrate().await.expect("migrate again").is_empty());
        assert_eq!(reopened.list_images().await.expect("list"), vec![created]);
    }
}
