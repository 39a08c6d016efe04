use async_trait::async_trait;

use crate::Result;

/// 推送提供方抽象接口。
///
/// `start_registration`为异步交接：调用返回后注册并未完成，提供方在
/// 自己的回调中构造`Job::registration_finished`任务投递给分发器。
/// 瞬时IO/安全错误以`ProviderIo`/`ProviderSecurity`返回，由处理器
/// 决定重试；提供方自身的重试策略不在此层。
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// 提供方标识，用于校验注册完成回调的来源
    fn kind(&self) -> &str;

    /// 当前环境下提供方是否可用
    fn is_available(&self) -> bool;

    /// 已有token是否需要刷新
    async fn should_update_registration(&self, current_token: &str) -> bool;

    /// 发起注册，结果经由独立的注册完成任务送达
    async fn start_registration(&self) -> Result<()>;
}
