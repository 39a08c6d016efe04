use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use registrar_core::{
    ChannelIdentity, ChannelRegistrationPayload, KeyValueStore, Result,
};

/// 注册token的存储键
const REGISTRATION_TOKEN_KEY: &str = "registrar.registration_token";

/// 渠道标识的存储键
const CHANNEL_IDENTITY_KEY: &str = "registrar.channel_identity";

/// 上次成功注册payload的存储键
pub(crate) const LAST_REGISTRATION_PAYLOAD_KEY: &str = "registrar.last_registration_payload";

/// 上次成功注册时间（毫秒）的存储键
pub(crate) const LAST_REGISTRATION_TIME_KEY: &str = "registrar.last_registration_time";

/// 设备侧注册属性的存储键
const DEVICE_SETTINGS_KEY: &str = "registrar.device_settings";

/// 宿主应用可调整的设备侧注册属性，整体作为一个JSON值持久化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    #[serde(default)]
    pub opt_in: bool,
    #[serde(default)]
    pub background_enabled: bool,
    #[serde(default)]
    pub set_tags: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub locale_language: Option<String>,
    #[serde(default)]
    pub locale_country: Option<String>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            opt_in: false,
            background_enabled: false,
            set_tags: true,
            tags: BTreeSet::new(),
            alias: None,
            timezone: None,
            locale_language: None,
            locale_country: None,
        }
    }
}

/// 注册相关持久化状态的类型化视图。
///
/// 所有读写都落在同一个键值存储上；持久化JSON解析失败按缺失处理并
/// 记录日志，不向调用方传播。
#[derive(Clone)]
pub struct RegistrationState {
    store: Arc<dyn KeyValueStore>,
}

impl RegistrationState {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// 当前推送注册token
    pub async fn registration_token(&self) -> Result<Option<String>> {
        self.store.get_string(REGISTRATION_TOKEN_KEY).await
    }

    /// 写入或清除注册token
    pub async fn set_registration_token(&self, token: Option<&str>) -> Result<()> {
        match token {
            Some(token) => self.store.put_string(REGISTRATION_TOKEN_KEY, token).await,
            None => self.store.remove(REGISTRATION_TOKEN_KEY).await,
        }
    }

    /// 持久化的渠道标识，解析失败视为不存在
    pub async fn channel_identity(&self) -> Result<Option<ChannelIdentity>> {
        let Some(value) = self.store.get_json(CHANNEL_IDENTITY_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(identity) => Ok(Some(identity)),
            Err(e) => {
                warn!("持久化的渠道标识无法解析，按不存在处理: {e}");
                Ok(None)
            }
        }
    }

    /// 写入或清除渠道标识，channel ID与location作为整体更新
    pub async fn set_channel_identity(&self, identity: Option<&ChannelIdentity>) -> Result<()> {
        match identity {
            Some(identity) => {
                let value = serde_json::to_value(identity)?;
                self.store.put_json(CHANNEL_IDENTITY_KEY, &value).await
            }
            None => self.store.remove(CHANNEL_IDENTITY_KEY).await,
        }
    }

    /// 上次成功注册的payload
    pub async fn last_registration_payload(&self) -> Result<Option<ChannelRegistrationPayload>> {
        let Some(value) = self.store.get_json(LAST_REGISTRATION_PAYLOAD_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) => {
                error!("上次注册payload解析失败: {e}");
                Ok(None)
            }
        }
    }

    /// 上次成功注册的时间（毫秒）。时间在未来说明时钟回拨过，
    /// 重置为0后返回。
    pub async fn last_registration_time_ms(&self) -> Result<i64> {
        let last = self
            .store
            .get_i64(LAST_REGISTRATION_TIME_KEY)
            .await?
            .unwrap_or(0);

        if last > Utc::now().timestamp_millis() {
            self.store.put_i64(LAST_REGISTRATION_TIME_KEY, 0).await?;
            return Ok(0);
        }
        Ok(last)
    }

    /// 记录一次成功的注册，payload与当前时间一并写入
    pub async fn set_last_registration(&self, payload: &ChannelRegistrationPayload) -> Result<()> {
        let value = serde_json::to_value(payload)?;
        self.store.put_json(LAST_REGISTRATION_PAYLOAD_KEY, &value).await?;
        self.store
            .put_i64(LAST_REGISTRATION_TIME_KEY, Utc::now().timestamp_millis())
            .await
    }

    /// 设备侧注册属性，解析失败回退默认值
    pub async fn device_settings(&self) -> Result<DeviceSettings> {
        let Some(value) = self.store.get_json(DEVICE_SETTINGS_KEY).await? else {
            return Ok(DeviceSettings::default());
        };
        match serde_json::from_value(value) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!("设备注册属性解析失败，使用默认值: {e}");
                Ok(DeviceSettings::default())
            }
        }
    }

    pub async fn set_device_settings(&self, settings: &DeviceSettings) -> Result<()> {
        let value = serde_json::to_value(settings)?;
        self.store.put_json(DEVICE_SETTINGS_KEY, &value).await
    }
}

#[cfg(test)]
mod tests {
    use registrar_infrastructure::store::MemoryKeyValueStore;

    use super::*;

    fn state() -> RegistrationState {
        RegistrationState::new(Arc::new(MemoryKeyValueStore::new()))
    }

    #[tokio::test]
    async fn test_registration_token_roundtrip() {
        let state = state();
        assert_eq!(state.registration_token().await.unwrap(), None);

        state.set_registration_token(Some("token-1")).await.unwrap();
        assert_eq!(
            state.registration_token().await.unwrap().as_deref(),
            Some("token-1")
        );

        state.set_registration_token(None).await.unwrap();
        assert_eq!(state.registration_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_channel_identity_roundtrip() {
        let state = state();
        assert!(state.channel_identity().await.unwrap().is_none());

        let identity = ChannelIdentity::new("abc", "https://x/abc");
        state.set_channel_identity(Some(&identity)).await.unwrap();
        assert_eq!(state.channel_identity().await.unwrap(), Some(identity));

        state.set_channel_identity(None).await.unwrap();
        assert!(state.channel_identity().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_future_registration_time_resets_to_zero() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let state = RegistrationState::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);

        let future = Utc::now().timestamp_millis() + 60_000;
        store
            .put_i64(LAST_REGISTRATION_TIME_KEY, future)
            .await
            .unwrap();

        assert_eq!(state.last_registration_time_ms().await.unwrap(), 0);
        // 重置已被持久化
        assert_eq!(
            store.get_i64(LAST_REGISTRATION_TIME_KEY).await.unwrap(),
            Some(0)
        );
    }

    #[tokio::test]
    async fn test_set_last_registration_records_payload_and_time() {
        let state = state();
        let payload = ChannelRegistrationPayload {
            device_type: "android".to_string(),
            ..Default::default()
        };

        state.set_last_registration(&payload).await.unwrap();

        assert_eq!(
            state.last_registration_payload().await.unwrap(),
            Some(payload)
        );
        let time = state.last_registration_time_ms().await.unwrap();
        assert!(time > 0);
        assert!(time <= Utc::now().timestamp_millis());
    }

    #[tokio::test]
    async fn test_corrupt_persisted_payload_treated_as_absent() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let state = RegistrationState::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);

        store
            .put_string(LAST_REGISTRATION_PAYLOAD_KEY, "{not json")
            .await
            .unwrap();

        assert!(state.last_registration_payload().await.unwrap().is_none());
    }
}
