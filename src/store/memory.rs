use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use super::{DocumentStore, IN_QUERY_LIMIT, StoreError, WriteOp};

/// 内存实现，供测试与本地开发使用。
/// 文档按完整路径排序存放，范围与前缀扫描直接走 BTreeMap。
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, Value>>,
    get_many_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已执行的 IN 查询次数，供批量拆分断言使用
    pub fn get_many_calls(&self) -> usize {
        self.get_many_calls.load(Ordering::SeqCst)
    }

    /// 当前全部文档路径，供不变量断言使用
    pub fn document_paths(&self) -> Vec<String> {
        self.docs
            .read()
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, Value>>, StoreError> {
        self.docs
            .read()
            .map_err(|_| StoreError::Unavailable("poisoned lock".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Value>>, StoreError> {
        self.docs
            .write()
            .map_err(|_| StoreError::Unavailable("poisoned lock".to_string()))
    }
}

fn merge_into(target: &mut Value, data: &Value) {
    match (target.as_object_mut(), data.as_object()) {
        (Some(existing), Some(fields)) => {
            for (key, value) in fields {
                existing.insert(key.clone(), value.clone());
            }
        }
        _ => *target = data.clone(),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read()?.get(path).cloned())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let prefix = format!("{}/", collection);
        let docs = self.read()?;
        Ok(docs
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| !path[prefix.len()..].contains('/'))
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn get_many(
        &self,
        collection: &str,
        ids: &[String],
    ) -> Result<Vec<(String, Value)>, StoreError> {
        if ids.len() > IN_QUERY_LIMIT {
            return Err(StoreError::TooManyIds(ids.len()));
        }
        self.get_many_calls.fetch_add(1, Ordering::SeqCst);

        let docs = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                docs.get(&format!("{}/{}", collection, id))
                    .map(|doc| (id.clone(), doc.clone()))
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
        let prefix = format!("{}/", collection);
        let docs = self.read()?;

        let mut rows: Vec<(String, Value)> = docs
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| !path[prefix.len()..].contains('/'))
            .filter(|(_, doc)| {
                doc.get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|v| v >= start && v <= end)
            })
            .map(|(path, doc)| (path[prefix.len()..].to_string(), doc.clone()))
            .collect();

        rows.sort_by(|(_, a), (_, b)| {
            let a = a.get(field).and_then(Value::as_str).unwrap_or("");
            let b = b.get(field).and_then(Value::as_str).unwrap_or("");
            a.cmp(b)
        });
        Ok(rows)
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut docs = self.write()?;

        // 先整体校验，保持全有或全无
        for op in &ops {
            if let WriteOp::Update { path, .. } = op {
                if !docs.contains_key(path) {
                    return Err(StoreError::MissingForUpdate { path: path.clone() });
                }
            }
        }

        for op in ops {
            match op {
                WriteOp::Set { path, data } => {
                    docs.insert(path, data);
                }
                WriteOp::Update { path, data } => {
                    if let Some(existing) = docs.get_mut(&path) {
                        merge_into(existing, &data);
                    }
                }
                WriteOp::Delete { path } => {
                    docs.remove(&path);
                }
            }
        }
        Ok(())
    }
}
