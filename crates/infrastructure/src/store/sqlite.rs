use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use registrar_core::{KeyValueStore, Result};

/// SQLite键值存储，跨进程重启持久
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 连接嵌入式SQLite数据库，不存在时自动创建并初始化表结构
    pub async fn connect(database_url: &str) -> Result<Self> {
        debug!("连接SQLite键值存储: {database_url}");

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .connect_with(connect_options)
            .await?;

        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get("value")))
    }

    async fn put_string(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO preferences (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM preferences WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (tempfile::TempDir, SqliteKeyValueStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registrar_test.db");
        let url = format!("sqlite://{}", path.display());
        let store = SqliteKeyValueStore::connect(&url).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_roundtrip_and_overwrite() {
        let (_dir, store) = temp_store().await;

        assert_eq!(store.get_string("k").await.unwrap(), None);

        store.put_string("k", "v1").await.unwrap();
        assert_eq!(store.get_string("k").await.unwrap().as_deref(), Some("v1"));

        store.put_string("k", "v2").await.unwrap();
        assert_eq!(store.get_string("k").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_noop() {
        let (_dir, store) = temp_store().await;

        store.remove("missing").await.unwrap();

        store.put_string("k", "v").await.unwrap();
        store.remove("k").await.unwrap();
        assert_eq!(store.get_string("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_json_accessors_over_sqlite() {
        let (_dir, store) = temp_store().await;

        let value = serde_json::json!({"channel_id": "abc"});
        store.put_json("identity", &value).await.unwrap();
        assert_eq!(store.get_json("identity").await.unwrap(), Some(value));
    }
}
