use async_trait::async_trait;

use crate::models::{ApiResponse, ChannelRegistrationPayload, TagGroupsMutation};
use crate::Result;

/// 渠道API客户端抽象接口。
///
/// 每个方法执行一次HTTP调用并返回响应快照；传输层失败（无响应）
/// 返回`RegistrarError::Network`。客户端不做任何内部重试，超时等
/// 时间约束由传输实现负责。
#[async_trait]
pub trait ChannelApiClient: Send + Sync {
    /// 创建渠道
    async fn create_channel(&self, payload: &ChannelRegistrationPayload) -> Result<ApiResponse>;

    /// 按location更新已有渠道
    async fn update_channel(
        &self,
        location: &str,
        payload: &ChannelRegistrationPayload,
    ) -> Result<ApiResponse>;

    /// 对指定渠道应用一条标签组变更
    async fn update_tag_groups(
        &self,
        channel_id: &str,
        mutation: &TagGroupsMutation,
    ) -> Result<ApiResponse>;
}
