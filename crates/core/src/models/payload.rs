use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// 渠道注册payload，描述一次安装实例的设备与推送属性。
///
/// 值类型，按字段逐一比较相等性；与上次成功注册的payload比较的结果
/// 决定是否需要发起网络调用。序列化采用BTree有序结构，保证同一内容
/// 的JSON形式稳定。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRegistrationPayload {
    pub device_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_address: Option<String>,
    pub opt_in: bool,
    pub background_enabled: bool,
    pub set_tags: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale_country: Option<String>,
}
