use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use registrar_core::{
    ApiResponse, ChannelApiClient, ChannelRegistrationPayload, RegistrarError, Result,
    TagGroupsMutation,
};

/// 渠道API客户端配置
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub app_key: String,
    pub app_secret: String,
}

/// 基于reqwest的渠道API客户端实现
pub struct ReqwestChannelApiClient {
    config: ApiClientConfig,
    http_client: reqwest::Client,
}

impl ReqwestChannelApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RegistrarError::Configuration(format!("HTTP客户端创建失败: {e}")))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// 发送请求并将响应转换为快照；连接失败、超时等传输层错误映射为Network
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<ApiResponse> {
        let response = request
            .basic_auth(&self.config.app_key, Some(&self.config.app_secret))
            .send()
            .await
            .map_err(|e| {
                warn!("渠道API请求无响应: {e}");
                RegistrarError::Network(e.to_string())
            })?;

        let status = response.status().as_u16();
        let mut snapshot = ApiResponse::new(status);
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                snapshot = snapshot.with_header(name.as_str(), value);
            }
        }
        let body = response
            .text()
            .await
            .map_err(|e| RegistrarError::Network(e.to_string()))?;
        Ok(snapshot.with_body(body))
    }
}

#[async_trait]
impl ChannelApiClient for ReqwestChannelApiClient {
    async fn create_channel(&self, payload: &ChannelRegistrationPayload) -> Result<ApiResponse> {
        let url = format!("{}/api/channels/", self.config.base_url);
        debug!("创建渠道: {url}");
        let request = self
            .http_client
            .post(&url)
            .json(&json!({ "channel": payload }));
        self.execute(request).await
    }

    async fn update_channel(
        &self,
        location: &str,
        payload: &ChannelRegistrationPayload,
    ) -> Result<ApiResponse> {
        debug!("更新渠道: {location}");
        let request = self
            .http_client
            .put(location)
            .json(&json!({ "channel": payload }));
        self.execute(request).await
    }

    async fn update_tag_groups(
        &self,
        channel_id: &str,
        mutation: &TagGroupsMutation,
    ) -> Result<ApiResponse> {
        let url = format!("{}/api/channels/tags/", self.config.base_url);
        debug!("更新渠道标签组: channel_id={channel_id} group={}", mutation.group);
        let mut body = serde_json::Map::new();
        body.insert(
            "audience".to_string(),
            json!({ "channel_id": channel_id }),
        );
        if !mutation.add.is_empty() {
            let mut add = serde_json::Map::new();
            add.insert(mutation.group.clone(), json!(mutation.add));
            body.insert("add".to_string(), add.into());
        }
        if !mutation.remove.is_empty() {
            let mut remove = serde_json::Map::new();
            remove.insert(mutation.group.clone(), json!(mutation.remove));
            body.insert("remove".to_string(), remove.into());
        }
        let request = self
            .http_client
            .post(&url)
            .json(&serde_json::Value::Object(body));
        self.execute(request).await
    }
}
