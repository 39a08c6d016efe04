use serde::{Deserialize, Serialize};

/// 服务端渠道资源标识，channel ID与location要么都存在要么都不存在，
/// 作为一个整体持久化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelIdentity {
    pub channel_id: String,
    pub location: String,
}

impl ChannelIdentity {
    pub fn new(channel_id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            location: location.into(),
        }
    }
}

/// 注册完成后向宿主应用发出的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationFinishedEvent {
    pub channel_id: Option<String>,
    pub is_create_request: bool,
    pub success: bool,
}
