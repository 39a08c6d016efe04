use thiserror::Error;

/// 注册服务错误类型定义
#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("网络错误: {0}")]
    Network(String),

    #[error("推送提供方IO错误: {0}")]
    ProviderIo(String),

    #[error("推送提供方安全错误: {0}")]
    ProviderSecurity(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据存储错误: {0}")]
    DataStore(String),

    #[error("任务分发错误: {0}")]
    Dispatch(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl RegistrarError {
    /// 是否为可通过重试恢复的瞬时错误
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RegistrarError::Network(_)
                | RegistrarError::ProviderIo(_)
                | RegistrarError::ProviderSecurity(_)
        )
    }
}

/// 统一的Result类型
pub type Result<T> = std::result::Result<T, RegistrarError>;
