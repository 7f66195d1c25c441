mod memory;
pub mod paths;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// 后端 IN 查询单次允许的最大 id 数
pub const IN_QUERY_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    #[error("document {path} missing for update")]
    MissingForUpdate { path: String },

    #[error("corrupt document at {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("too many ids for IN query: {0}")]
    TooManyIds(usize),
}

/// 一次原子批量提交中的单个写操作
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// 覆盖写入整个文档
    Set { path: String, data: Value },
    /// 合并顶层字段；目标不存在时整批失败
    Update { path: String, data: Value },
    /// 删除文档，目标不存在时忽略
    Delete { path: String },
}

/// 事务型键-文档存储的抽象。
///
/// 路径形如 `collection/{id}`，子集合继续用 `/` 级联
/// （`geo_index/{bucket}/users/{userId}`）。批量写入要么全部生效
/// 要么全部失败，但批次之间没有隔离保证。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 按路径读取单个文档
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// 列出集合下的全部文档
    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError>;

    /// IN 查询：按 id 批量读取，返回 (id, 文档)。
    /// 单次最多 IN_QUERY_LIMIT 个 id，超出直接报错。
    async fn get_many(
        &self,
        collection: &str,
        ids: &[String],
    ) -> Result<Vec<(String, Value)>, StoreError>;

    /// 对字符串字段做闭区间范围查询，按字段值升序返回 (id, 文档)
    async fn query_range(
        &self,
        collection: &str,
        field: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<(String, Value)>, StoreError>;

    /// 原子批量写入
    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;
}

/// 把存储返回的文档解析成类型化结构，失败按数据完整性故障处理
pub fn parse_document<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| {
        tracing::error!("corrupt document at {}: {}", path, e);
        StoreError::Corrupt {
            path: path.to_string(),
            reason: e.to_string(),
        }
    })
}
