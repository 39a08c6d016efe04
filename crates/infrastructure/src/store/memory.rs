use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use registrar_core::{KeyValueStore, Result};

/// 内存键值存储，用于测试与嵌入式场景，进程退出即丢失
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put_string(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_string_roundtrip_and_remove() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.get_string("k").await.unwrap(), None);

        store.put_string("k", "v").await.unwrap();
        assert_eq!(store.get_string("k").await.unwrap().as_deref(), Some("v"));

        store.remove("k").await.unwrap();
        assert_eq!(store.get_string("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_typed_default_accessors() {
        let store = MemoryKeyValueStore::new();

        store.put_i64("count", 42).await.unwrap();
        assert_eq!(store.get_i64("count").await.unwrap(), Some(42));

        let value = serde_json::json!({"a": [1, 2, 3]});
        store.put_json("doc", &value).await.unwrap();
        assert_eq!(store.get_json("doc").await.unwrap(), Some(value));

        // 无法解析的内容按缺失处理
        store.put_string("bad", "not a number").await.unwrap();
        assert_eq!(store.get_i64("bad").await.unwrap(), None);
    }
}
