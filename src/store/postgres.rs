use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use super::{DocumentStore, IN_QUERY_LIMIT, StoreError, WriteOp};

/// Postgres 实现：所有文档放在一张 JSONB 表里，
/// 批量写入对应一个数据库事务。
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                path TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                data JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS documents_collection_idx ON documents (collection)",
        )
        .execute(&self.pool)
        .await?;

        // 实时位置流按 geohash 做范围查询
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS documents_geohash_idx ON documents (collection, (data->>'geohash'))",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn doc_id(path: &str) -> String {
        path.rsplit('/').next().unwrap_or(path).to_string()
    }

    fn collection_of(path: &str) -> String {
        path.rsplit_once('/')
            .map(|(collection, _)| collection.to_string())
            .unwrap_or_default()
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query("SELECT data FROM documents WHERE path = $1")
            .bind(path)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(row.map(|r| r.get("data")))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let rows = sqlx::query("SELECT data FROM documents WHERE collection = $1")
            .bind(collection)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(rows.into_iter().map(|r| r.get("data")).collect())
    }

    async fn get_many(
        &self,
        collection: &str,
        ids: &[String],
    ) -> Result<Vec<(String, Value)>, StoreError> {
        if ids.len() > IN_QUERY_LIMIT {
            return Err(StoreError::TooManyIds(ids.len()));
        }

        let paths: Vec<String> = ids
            .iter()
            .map(|id| format!("{}/{}", collection, id))
            .collect();
        let rows =
            sqlx::query("SELECT path, data FROM documents WHERE collection = $1 AND path = ANY($2)")
                .bind(collection)
                .bind(&paths)
                .fetch_all(&self.pool)
                .await
                .map_err(unavailable)?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let path: String = r.get("path");
                (Self::doc_id(&path), r.get("data"))
            })
            .collect())
    }

    async fn query_range(
        &self,
        collection: &str,
        field: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT path, data FROM documents
            WHERE collection = $1 AND data->>$2 BETWEEN $3 AND $4
            ORDER BY data->>$2
            "#,
        )
        .bind(collection)
        .bind(field)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let path: String = r.get("path");
                (Self::doc_id(&path), r.get("data"))
            })
            .collect())
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        for op in ops {
            match op {
                WriteOp::Set { path, data } => {
                    let collection = Self::collection_of(&path);
                    sqlx::query(
                        r#"
                        INSERT INTO documents (path, collection, data)
                        VALUES ($1, $2, $3)
                        ON CONFLICT (path) DO UPDATE SET data = EXCLUDED.data
                        "#,
                    )
                    .bind(&path)
                    .bind(&collection)
                    .bind(&data)
                    .execute(&mut *tx)
                    .await
                    .map_err(unavailable)?;
                }
                WriteOp::Update { path, data } => {
                    let result = sqlx::query("UPDATE documents SET data = data || $2 WHERE path = $1")
                        .bind(&path)
                        .bind(&data)
                        .execute(&mut *tx)
                        .await
                        .map_err(unavailable)?;
                    if result.rows_affected() == 0 {
                        // 事务随 tx 丢弃而回滚
                        return Err(StoreError::MissingForUpdate { path });
                    }
                }
                WriteOp::Delete { path } => {
                    sqlx::query("DELETE FROM documents WHERE path = $1")
                        .bind(&path)
                        .execute(&mut *tx)
                        .await
                        .map_err(unavailable)?;
                }
            }
        }

        tx.commit().await.map_err(unavailable)
    }
}
