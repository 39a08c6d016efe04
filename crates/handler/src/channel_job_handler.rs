use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use registrar_core::{
    ChannelConfig, ChannelIdentity, ChannelRegistrationPayload, ChannelApiClient, HostCallbacks,
    Job, JobAction, JobDispatcher, JobHandler, JobResult, KeyValueStore, NoopHostCallbacks,
    NoopRegistrationListener, PushProvider, RegistrationFinishedEvent, RegistrationListener,
    Result, TagGroupsMutation, EXTRA_PROVIDER_KIND, EXTRA_REGISTRATION_ID,
    EXTRA_TAG_GROUP_MUTATIONS,
};

use crate::registration_state::RegistrationState;
use crate::tag_store::TagMutationStore;

/// 渠道注册更新的最大间隔，超过后即使payload未变化也强制重新注册
const CHANNEL_REREGISTRATION_INTERVAL_MS: i64 = 24 * 60 * 60 * 1000; // 24小时

/// 渠道创建响应体中channel ID的字段名
const CHANNEL_ID_KEY: &str = "channel_id";

/// 渠道创建响应中location的响应头名
const CHANNEL_LOCATION_HEADER: &str = "Location";

/// 渠道注册任务处理器。
///
/// 实现注册协议状态机：推送提供方注册 -> 渠道创建/更新 -> 标签组同步。
/// 每个任务要么结束要么重新入队，处理器本身不维护超时，退避由分发器
/// 负责。
///
/// `is_push_registering`与`is_registration_started`是进程生命周期内的
/// 共享标志，由分发器的单worker串行执行保证一致性（`&mut self`）。
/// 宿主以多进程运行时相同任务可能各自启动一次注册，started标志只做
/// 尽力而为的去重，不做严格保证。
pub struct ChannelJobHandler {
    config: ChannelConfig,
    provider: Option<Arc<dyn PushProvider>>,
    channel_client: Arc<dyn ChannelApiClient>,
    dispatcher: Arc<dyn JobDispatcher>,
    listener: Arc<dyn RegistrationListener>,
    host: Arc<dyn HostCallbacks>,
    state: RegistrationState,
    tag_store: TagMutationStore,
    is_push_registering: bool,
    is_registration_started: bool,
}

impl ChannelJobHandler {
    pub fn builder(
        channel_client: Arc<dyn ChannelApiClient>,
        dispatcher: Arc<dyn JobDispatcher>,
        store: Arc<dyn KeyValueStore>,
    ) -> ChannelJobHandlerBuilder {
        ChannelJobHandlerBuilder {
            config: ChannelConfig::default(),
            provider: None,
            channel_client,
            dispatcher,
            listener: Arc::new(NoopRegistrationListener),
            host: Arc::new(NoopHostCallbacks),
            store,
        }
    }

    /// 启动注册流程。根据是否需要推送注册进入推送注册或渠道注册分支。
    async fn on_start_registration(&mut self) -> Result<JobResult> {
        if self.is_registration_started {
            // 多进程宿主下重复触发属正常情况
            debug!("注册流程已在本进程启动，忽略重复触发");
            return Ok(JobResult::Finished);
        }

        self.is_registration_started = true;

        let push_available = self
            .provider
            .as_ref()
            .map(|p| p.is_available())
            .unwrap_or(false);

        if push_available {
            self.is_push_registering = true;
            self.dispatch(JobAction::UpdatePushRegistration).await?;
        } else {
            // 无推送提供方的平台直接进入渠道注册
            self.dispatch(JobAction::UpdateChannelRegistration).await?;
        }

        Ok(JobResult::Finished)
    }

    /// 更新推送注册。需要新token时发起异步注册，结果由独立的
    /// 注册完成任务送达。
    async fn on_update_push_registration(&mut self) -> Result<JobResult> {
        self.is_push_registering = true;

        match self.provider.clone() {
            None => {
                error!("推送注册失败: 未配置推送提供方");
                self.is_push_registering = false;
            }
            Some(provider) if !provider.is_available() => {
                error!("推送注册失败: 推送提供方不可用: {}", provider.kind());
                self.is_push_registering = false;
            }
            Some(provider) => {
                let current_token = self.state.registration_token().await?;
                let needs_registration = match current_token.as_deref() {
                    None | Some("") => true,
                    Some(token) => provider.should_update_registration(token).await,
                };

                if needs_registration {
                    self.state.set_registration_token(None).await?;
                    if let Err(e) = provider.start_registration().await {
                        error!("推送注册失败，稍后重试: {e}");
                        return Ok(JobResult::Retry);
                    }
                } else {
                    self.is_push_registering = false;
                }
            }
        }

        if !self.is_push_registering {
            // 没有未完成的异步交接，直接进入渠道注册
            self.dispatch(JobAction::UpdateChannelRegistration).await?;
        }

        Ok(JobResult::Finished)
    }

    /// 推送提供方注册完成回调。校验回调来源后持久化新token并继续
    /// 渠道注册。
    async fn on_registration_finished(&mut self, job: &Job) -> Result<JobResult> {
        let provider_kind = job.extras.string(EXTRA_PROVIDER_KIND).unwrap_or_default();

        let Some(provider) = self.provider.clone() else {
            error!("收到注册完成回调但未配置推送提供方: {provider_kind}");
            return Ok(JobResult::Finished);
        };

        if provider.kind() != provider_kind {
            // 过期或异源回调，不算错误
            error!("收到来自意外推送提供方的注册完成回调: {provider_kind}");
            return Ok(JobResult::Finished);
        }

        if !provider.is_available() {
            error!("收到注册完成回调时推送提供方已不可用，忽略");
            return Ok(JobResult::Finished);
        }

        match job.extras.string(EXTRA_REGISTRATION_ID) {
            Some(registration_id) => {
                info!("推送注册成功, registration ID: {registration_id}");
                self.state
                    .set_registration_token(Some(registration_id))
                    .await?;
            }
            None => {
                // 提供方控制自己的重试，这里只记录失败
                error!("推送提供方注册失败: {}", provider.kind());
            }
        }

        self.is_push_registering = false;
        self.dispatch(JobAction::UpdateChannelRegistration).await?;

        Ok(JobResult::Finished)
    }

    /// 更新渠道注册。推送注册进行中时跳过，避免与注册竞争。
    async fn on_update_channel_registration(&mut self) -> Result<JobResult> {
        if self.is_push_registering {
            debug!("推送注册进行中，跳过渠道注册更新");
            return Ok(JobResult::Finished);
        }

        debug!("执行渠道注册");

        let payload = self.next_registration_payload().await?;
        match self.state.channel_identity().await? {
            Some(identity) if !identity.channel_id.is_empty() => {
                self.update_channel(&identity, &payload).await
            }
            _ => self.create_channel(&payload).await,
        }
    }

    /// 更新已有渠道
    async fn update_channel(
        &mut self,
        identity: &ChannelIdentity,
        payload: &ChannelRegistrationPayload,
    ) -> Result<JobResult> {
        if !self.should_update_registration(payload).await? {
            debug!("渠道信息已是最新，跳过更新");
            return Ok(JobResult::Finished);
        }

        let response = self
            .channel_client
            .update_channel(&identity.location, payload)
            .await;

        let response = match response {
            // 无响应，稍后重试
            Err(e) => {
                error!("渠道注册更新失败，稍后重试: {e}");
                self.notify_registration_finished(false, false).await?;
                return Ok(JobResult::Retry);
            }
            Ok(response) if response.is_server_error() => {
                error!("渠道注册更新失败，稍后重试，状态码: {}", response.status);
                self.notify_registration_finished(false, false).await?;
                return Ok(JobResult::Retry);
            }
            Ok(response) => response,
        };

        // 2xx (API只应返回200或201)
        if response.is_success() {
            info!("渠道注册更新成功，状态码: {}", response.status);
            self.state.set_last_registration(payload).await?;
            self.notify_registration_finished(true, false).await?;
            return Ok(JobResult::Finished);
        }

        // 409: 渠道已不存在，清除本地标识后重新创建
        if response.status == 409 {
            warn!("渠道冲突(409)，清除渠道标识并重新创建");
            self.state.set_channel_identity(None).await?;
            self.dispatch(JobAction::UpdateChannelRegistration).await?;
            return Ok(JobResult::Finished);
        }

        // 意外状态码，重试不会改变结果
        error!("渠道注册更新失败，意外状态码: {}", response.status);
        self.notify_registration_finished(false, false).await?;
        Ok(JobResult::Finished)
    }

    /// 创建渠道
    async fn create_channel(&mut self, payload: &ChannelRegistrationPayload) -> Result<JobResult> {
        if self.config.creation_delayed {
            info!("渠道创建当前被禁用");
            return Ok(JobResult::Finished);
        }

        let response = match self.channel_client.create_channel(payload).await {
            Err(e) => {
                error!("渠道创建失败，稍后重试: {e}");
                self.notify_registration_finished(false, true).await?;
                return Ok(JobResult::Retry);
            }
            Ok(response) if response.is_server_error() => {
                error!("渠道创建失败，稍后重试，状态码: {}", response.status);
                self.notify_registration_finished(false, true).await?;
                return Ok(JobResult::Retry);
            }
            Ok(response) => response,
        };

        if response.status == 200 || response.status == 201 {
            let channel_id = parse_channel_id(&response.body);
            let location = response
                .header(CHANNEL_LOCATION_HEADER)
                .unwrap_or_default()
                .to_string();

            let Some(channel_id) = channel_id.filter(|id| !id.is_empty()) else {
                return self.finish_malformed_creation(&location).await;
            };
            if location.is_empty() {
                return self.finish_malformed_creation(&location).await;
            }

            info!(
                "渠道创建成功，状态码: {}, channel ID: {channel_id}",
                response.status
            );

            let identity = ChannelIdentity::new(channel_id, location);
            self.state.set_channel_identity(Some(&identity)).await?;
            self.state.set_last_registration(payload).await?;
            self.notify_registration_finished(true, true).await?;

            if response.status == 200 {
                // 200说明渠道在服务端已存在，可能还关联着旧安装的named user
                if self.config.clear_named_user_on_reinstall {
                    self.host.disassociate_named_user_if_unset().await;
                }
            }

            // named user可能在渠道创建前已被设置
            self.host.dispatch_named_user_update().await;
            self.dispatch(JobAction::UpdateChannelRegistration).await?;
            self.dispatch(JobAction::UpdateTagGroups).await?;
            self.host.refresh_inbox_user().await;
            self.host.upload_analytics_events().await;

            return Ok(JobResult::Finished);
        }

        // 意外状态码
        error!("渠道创建失败，意外状态码: {}", response.status);
        self.notify_registration_finished(false, true).await?;
        Ok(JobResult::Finished)
    }

    /// 2xx但响应缺少必要字段。服务端契约被破坏，重试不会改变结果，
    /// 记录后结束。
    async fn finish_malformed_creation(&mut self, location: &str) -> Result<JobResult> {
        error!("渠道创建响应缺少channel ID或location: location={location:?}");
        self.notify_registration_finished(false, true).await?;
        Ok(JobResult::Finished)
    }

    /// 同步一条待处理的标签组变更。每次任务只发送队列头部一条，
    /// 发送成功后如仍有剩余则链式投递下一个同步任务。
    async fn on_update_tag_groups(&mut self) -> Result<JobResult> {
        self.tag_store.migrate_legacy().await?;

        let Some(identity) = self.state.channel_identity().await? else {
            debug!("无channel ID，跳过标签组更新");
            return Ok(JobResult::Finished);
        };

        let mutations = self.tag_store.pending().await?;
        let Some(head) = mutations.first() else {
            debug!("没有待处理的标签组变更，跳过更新");
            return Ok(JobResult::Finished);
        };

        let response = match self
            .channel_client
            .update_tag_groups(&identity.channel_id, head)
            .await
        {
            Err(e) => {
                info!("标签组更新失败，稍后重试: {e}");
                return Ok(JobResult::Retry);
            }
            Ok(response) if response.is_server_error() => {
                info!("标签组更新失败，稍后重试，状态码: {}", response.status);
                return Ok(JobResult::Retry);
            }
            Ok(response) => response,
        };

        info!("标签组更新完成，状态码: {}", response.status);

        // 403/400是服务端对该条变更的明确拒绝，同样出队
        if response.is_success() || response.status == 403 || response.status == 400 {
            let remaining = &mutations[1..];
            self.tag_store.set_pending(remaining).await?;

            if !remaining.is_empty() {
                self.dispatch(JobAction::UpdateTagGroups).await?;
            }
        }
        // 其它状态码视为语义不明: 不出队也不重试，等待下次触发重发

        Ok(JobResult::Finished)
    }

    /// 将任务extras携带的新标签组变更合入持久化队列
    async fn on_apply_tag_group_changes(&mut self, job: &Job) -> Result<JobResult> {
        self.tag_store.migrate_legacy().await?;

        let incoming: Vec<TagGroupsMutation> = match job
            .extras
            .string(EXTRA_TAG_GROUP_MUTATIONS)
            .map(serde_json::from_str)
        {
            Some(Ok(mutations)) => mutations,
            Some(Err(e)) => {
                error!("解析标签组变更失败: {e}");
                return Ok(JobResult::Finished);
            }
            None => {
                error!("标签组变更任务缺少{EXTRA_TAG_GROUP_MUTATIONS} extras");
                return Ok(JobResult::Finished);
            }
        };

        self.tag_store.append_and_collapse(incoming).await?;

        if self.state.channel_identity().await?.is_some() {
            self.dispatch(JobAction::UpdateTagGroups).await?;
        }

        Ok(JobResult::Finished)
    }

    /// 根据payload与上次成功注册判断是否需要发起网络调用。
    /// payload有变化或距上次成功注册超过24小时时需要更新。
    async fn should_update_registration(
        &self,
        payload: &ChannelRegistrationPayload,
    ) -> Result<bool> {
        let last_payload = self.state.last_registration_payload().await?;
        let elapsed_ms =
            Utc::now().timestamp_millis() - self.state.last_registration_time_ms().await?;

        Ok(last_payload.as_ref() != Some(payload)
            || elapsed_ms >= CHANNEL_REREGISTRATION_INTERVAL_MS)
    }

    /// 组装当前期望的注册payload
    async fn next_registration_payload(&self) -> Result<ChannelRegistrationPayload> {
        let settings = self.state.device_settings().await?;
        let push_address = self.state.registration_token().await?;

        Ok(ChannelRegistrationPayload {
            device_type: self.config.device_type.clone(),
            opt_in: settings.opt_in && push_address.is_some(),
            push_address,
            background_enabled: settings.background_enabled,
            set_tags: settings.set_tags,
            tags: if settings.set_tags {
                settings.tags
            } else {
                Default::default()
            },
            alias: settings.alias,
            timezone: settings.timezone,
            locale_language: settings.locale_language,
            locale_country: settings.locale_country,
        })
    }

    /// 向宿主应用发出注册完成通知
    async fn notify_registration_finished(&self, success: bool, is_create: bool) -> Result<()> {
        let channel_id = self
            .state
            .channel_identity()
            .await?
            .map(|identity| identity.channel_id);

        self.listener.registration_finished(&RegistrationFinishedEvent {
            channel_id,
            is_create_request: is_create,
            success,
        });
        Ok(())
    }

    async fn dispatch(&self, action: JobAction) -> Result<()> {
        self.dispatcher.dispatch(Job::new(action)).await
    }
}

#[async_trait]
impl JobHandler for ChannelJobHandler {
    async fn perform_job(&mut self, job: Job) -> JobResult {
        let outcome = match job.action {
            JobAction::StartRegistration => self.on_start_registration().await,
            JobAction::UpdatePushRegistration => self.on_update_push_registration().await,
            JobAction::RegistrationFinished => self.on_registration_finished(&job).await,
            JobAction::UpdateChannelRegistration => self.on_update_channel_registration().await,
            JobAction::ApplyTagGroupChanges => self.on_apply_tag_group_changes(&job).await,
            JobAction::UpdateTagGroups => self.on_update_tag_groups().await,
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                // 持久化存储或分发通道故障，保守地按瞬时故障重试
                error!("任务 {} 执行出错，将重试: {e}", job.action);
                JobResult::Retry
            }
        }
    }
}

/// 从渠道创建响应体中解析channel ID
fn parse_channel_id(body: &str) -> Option<String> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value
            .get(CHANNEL_ID_KEY)
            .and_then(|v| v.as_str())
            .map(String::from),
        Err(e) => {
            debug!("渠道创建响应体解析失败: {e}, body: {body}");
            None
        }
    }
}

/// 处理器构建器，listener/host默认空实现，provider默认不配置
pub struct ChannelJobHandlerBuilder {
    config: ChannelConfig,
    provider: Option<Arc<dyn PushProvider>>,
    channel_client: Arc<dyn ChannelApiClient>,
    dispatcher: Arc<dyn JobDispatcher>,
    listener: Arc<dyn RegistrationListener>,
    host: Arc<dyn HostCallbacks>,
    store: Arc<dyn KeyValueStore>,
}

impl ChannelJobHandlerBuilder {
    pub fn config(mut self, config: ChannelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn PushProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn RegistrationListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn host_callbacks(mut self, host: Arc<dyn HostCallbacks>) -> Self {
        self.host = host;
        self
    }

    pub fn build(self) -> ChannelJobHandler {
        ChannelJobHandler {
            config: self.config,
            provider: self.provider,
            channel_client: self.channel_client,
            dispatcher: self.dispatcher,
            listener: self.listener,
            host: self.host,
            state: RegistrationState::new(Arc::clone(&self.store)),
            tag_store: TagMutationStore::new(self.store),
            is_push_registering: false,
            is_registration_started: false,
        }
    }
}
