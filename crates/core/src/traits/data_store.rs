use async_trait::async_trait;
use tracing::warn;

use crate::Result;

/// 持久化键值存储抽象接口，跨进程重启持久。
///
/// i64与JSON访问基于字符串访问提供默认实现；已持久化数据解析失败
/// 视为缺失（记录日志后返回None），不会让调用方失败。
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    async fn put_string(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        let raw = self.get_string(key).await?;
        Ok(raw.and_then(|s| match s.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("键 {key} 的持久化数值无法解析，按缺失处理: {s}");
                None
            }
        }))
    }

    async fn put_i64(&self, key: &str, value: i64) -> Result<()> {
        self.put_string(key, &value.to_string()).await
    }

    async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let raw = self.get_string(key).await?;
        Ok(raw.and_then(|s| match serde_json::from_str(&s) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("键 {key} 的持久化JSON无法解析，按缺失处理: {e}");
                None
            }
        }))
    }

    async fn put_json(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        self.put_string(key, &value.to_string()).await
    }
}
