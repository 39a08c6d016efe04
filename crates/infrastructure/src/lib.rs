//! 基础设施层：键值存储与渠道API客户端的具体实现

pub mod channel_client;
pub mod store;

pub use channel_client::{ApiClientConfig, ReqwestChannelApiClient};
pub use store::{MemoryKeyValueStore, SqliteKeyValueStore};
