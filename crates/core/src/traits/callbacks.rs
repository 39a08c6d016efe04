use async_trait::async_trait;

use crate::models::RegistrationFinishedEvent;

/// 注册完成事件监听器，面向宿主应用的fire-and-forget通知
pub trait RegistrationListener: Send + Sync {
    fn registration_finished(&self, event: &RegistrationFinishedEvent);
}

/// 渠道创建成功后需要联动的宿主子系统。
///
/// named user、收件箱与分析上报都是外部协作方，默认实现为空操作，
/// 未接入这些子系统的宿主无需实现。
#[async_trait]
pub trait HostCallbacks: Send + Sync {
    /// 触发named user更新分发
    async fn dispatch_named_user_update(&self) {}

    /// 重装场景下named user未设置时解除服务端关联
    async fn disassociate_named_user_if_unset(&self) {}

    /// 强制刷新用户收件箱
    async fn refresh_inbox_user(&self) {}

    /// 上传积压的分析事件
    async fn upload_analytics_events(&self) {}
}

/// 空实现的注册监听器
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRegistrationListener;

impl RegistrationListener for NoopRegistrationListener {
    fn registration_finished(&self, _event: &RegistrationFinishedEvent) {}
}

/// 空实现的宿主回调
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHostCallbacks;

#[async_trait]
impl HostCallbacks for NoopHostCallbacks {}
