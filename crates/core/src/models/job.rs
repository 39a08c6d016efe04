use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 注册完成回调中携带推送提供方标识的extras键
pub const EXTRA_PROVIDER_KIND: &str = "provider_kind";

/// 注册完成回调中携带registration ID的extras键
pub const EXTRA_REGISTRATION_ID: &str = "registration_id";

/// 标签组变更任务中携带变更列表的extras键
pub const EXTRA_TAG_GROUP_MUTATIONS: &str = "tag_group_mutations";

/// 任务动作。字符串标签是分发方与处理器之间的持久化契约，
/// 已入队的任务会跨版本反序列化，标签一旦发布不可更改。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobAction {
    #[serde(rename = "ACTION_START_REGISTRATION")]
    StartRegistration,
    #[serde(rename = "ACTION_UPDATE_PUSH_REGISTRATION")]
    UpdatePushRegistration,
    #[serde(rename = "ACTION_REGISTRATION_FINISHED")]
    RegistrationFinished,
    #[serde(rename = "ACTION_UPDATE_CHANNEL_REGISTRATION")]
    UpdateChannelRegistration,
    #[serde(rename = "ACTION_APPLY_TAG_GROUP_CHANGES")]
    ApplyTagGroupChanges,
    #[serde(rename = "ACTION_UPDATE_TAG_GROUPS")]
    UpdateTagGroups,
}

impl JobAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobAction::StartRegistration => "ACTION_START_REGISTRATION",
            JobAction::UpdatePushRegistration => "ACTION_UPDATE_PUSH_REGISTRATION",
            JobAction::RegistrationFinished => "ACTION_REGISTRATION_FINISHED",
            JobAction::UpdateChannelRegistration => "ACTION_UPDATE_CHANNEL_REGISTRATION",
            JobAction::ApplyTagGroupChanges => "ACTION_APPLY_TAG_GROUP_CHANGES",
            JobAction::UpdateTagGroups => "ACTION_UPDATE_TAG_GROUPS",
        }
    }
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 任务执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobResult {
    /// 任务结束，不再重新入队
    Finished,
    /// 任务重新入队，退避间隔由分发器决定
    Retry,
}

/// 任务附加参数，键为稳定字符串常量
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobExtras(BTreeMap<String, serde_json::Value>);

impl JobExtras {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(|v| v.as_i64())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 一次性投递的任务描述，构建后不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub action: JobAction,
    pub extras: JobExtras,
}

impl Job {
    /// 创建不携带extras的任务
    pub fn new(action: JobAction) -> Self {
        Self::builder(action).build()
    }

    pub fn builder(action: JobAction) -> JobBuilder {
        JobBuilder {
            action,
            extras: JobExtras::new(),
        }
    }

    /// 构建推送提供方注册完成回调任务
    pub fn registration_finished(provider_kind: &str, registration_id: Option<&str>) -> Self {
        let mut builder =
            Job::builder(JobAction::RegistrationFinished).extra(EXTRA_PROVIDER_KIND, provider_kind);
        if let Some(id) = registration_id {
            builder = builder.extra(EXTRA_REGISTRATION_ID, id);
        }
        builder.build()
    }
}

/// 任务构建器
pub struct JobBuilder {
    action: JobAction,
    extras: JobExtras,
}

impl JobBuilder {
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extras.insert(key, value);
        self
    }

    pub fn build(self) -> Job {
        Job {
            id: Uuid::new_v4().to_string(),
            action: self.action,
            extras: self.extras,
        }
    }
}
