//! 处理器测试用的手写mock协作方

pub mod mocks {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use registrar_core::{
        ApiResponse, ChannelApiClient, ChannelRegistrationPayload, HostCallbacks, Job,
        JobDispatcher, PushProvider, RegistrarError, RegistrationFinishedEvent,
        RegistrationListener, Result, TagGroupsMutation,
    };

    /// 按脚本返回响应并记录调用的渠道API客户端
    #[derive(Default)]
    pub struct MockChannelApiClient {
        create_responses: Mutex<VecDeque<Result<ApiResponse>>>,
        update_responses: Mutex<VecDeque<Result<ApiResponse>>>,
        tag_responses: Mutex<VecDeque<Result<ApiResponse>>>,
        pub create_calls: Mutex<Vec<ChannelRegistrationPayload>>,
        pub update_calls: Mutex<Vec<(String, ChannelRegistrationPayload)>>,
        pub tag_calls: Mutex<Vec<(String, TagGroupsMutation)>>,
    }

    impl MockChannelApiClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn script_create(&self, response: Result<ApiResponse>) {
            self.create_responses.lock().unwrap().push_back(response);
        }

        pub fn script_update(&self, response: Result<ApiResponse>) {
            self.update_responses.lock().unwrap().push_back(response);
        }

        pub fn script_tag_update(&self, response: Result<ApiResponse>) {
            self.tag_responses.lock().unwrap().push_back(response);
        }

        pub fn no_response() -> Result<ApiResponse> {
            Err(RegistrarError::Network("connection refused".to_string()))
        }

        fn next(queue: &Mutex<VecDeque<Result<ApiResponse>>>, endpoint: &str) -> Result<ApiResponse> {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("没有为{endpoint}准备响应脚本"))
        }
    }

    #[async_trait]
    impl ChannelApiClient for MockChannelApiClient {
        async fn create_channel(
            &self,
            payload: &ChannelRegistrationPayload,
        ) -> Result<ApiResponse> {
            self.create_calls.lock().unwrap().push(payload.clone());
            Self::next(&self.create_responses, "create_channel")
        }

        async fn update_channel(
            &self,
            location: &str,
            payload: &ChannelRegistrationPayload,
        ) -> Result<ApiResponse> {
            self.update_calls
                .lock()
                .unwrap()
                .push((location.to_string(), payload.clone()));
            Self::next(&self.update_responses, "update_channel")
        }

        async fn update_tag_groups(
            &self,
            channel_id: &str,
            mutation: &TagGroupsMutation,
        ) -> Result<ApiResponse> {
            self.tag_calls
                .lock()
                .unwrap()
                .push((channel_id.to_string(), mutation.clone()));
            Self::next(&self.tag_responses, "update_tag_groups")
        }
    }

    /// 只记录投递任务的分发器
    #[derive(Default)]
    pub struct RecordingDispatcher {
        pub dispatched: Mutex<Vec<Job>>,
    }

    impl RecordingDispatcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// 取走已记录的任务
        pub fn drain(&self) -> Vec<Job> {
            std::mem::take(&mut *self.dispatched.lock().unwrap())
        }

        pub fn dispatched_actions(&self) -> Vec<registrar_core::JobAction> {
            self.dispatched
                .lock()
                .unwrap()
                .iter()
                .map(|job| job.action)
                .collect()
        }
    }

    #[async_trait]
    impl JobDispatcher for RecordingDispatcher {
        async fn dispatch(&self, job: Job) -> Result<()> {
            self.dispatched.lock().unwrap().push(job);
            Ok(())
        }
    }

    /// 记录注册完成事件的监听器
    #[derive(Default)]
    pub struct RecordingListener {
        pub events: Mutex<Vec<RegistrationFinishedEvent>>,
    }

    impl RecordingListener {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn last_event(&self) -> Option<RegistrationFinishedEvent> {
            self.events.lock().unwrap().last().cloned()
        }
    }

    impl RegistrationListener for RecordingListener {
        fn registration_finished(&self, event: &RegistrationFinishedEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    /// 记录调用次数的宿主回调
    #[derive(Default)]
    pub struct RecordingHostCallbacks {
        pub named_user_updates: AtomicUsize,
        pub named_user_disassociations: AtomicUsize,
        pub inbox_refreshes: AtomicUsize,
        pub analytics_uploads: AtomicUsize,
    }

    impl RecordingHostCallbacks {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl HostCallbacks for RecordingHostCallbacks {
        async fn dispatch_named_user_update(&self) {
            self.named_user_updates.fetch_add(1, Ordering::SeqCst);
        }

        async fn disassociate_named_user_if_unset(&self) {
            self.named_user_disassociations.fetch_add(1, Ordering::SeqCst);
        }

        async fn refresh_inbox_user(&self) {
            self.inbox_refreshes.fetch_add(1, Ordering::SeqCst);
        }

        async fn upload_analytics_events(&self) {
            self.analytics_uploads.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// 可配置行为的推送提供方
    pub struct MockPushProvider {
        kind: String,
        pub available: AtomicBool,
        pub wants_refresh: AtomicBool,
        start_results: Mutex<VecDeque<Result<()>>>,
        pub start_calls: AtomicUsize,
    }

    impl MockPushProvider {
        pub fn new(kind: &str) -> Self {
            Self {
                kind: kind.to_string(),
                available: AtomicBool::new(true),
                wants_refresh: AtomicBool::new(false),
                start_results: Mutex::new(VecDeque::new()),
                start_calls: AtomicUsize::new(0),
            }
        }

        pub fn script_start(&self, result: Result<()>) {
            self.start_results.lock().unwrap().push_back(result);
        }
    }

    #[async_trait]
    impl PushProvider for MockPushProvider {
        fn kind(&self) -> &str {
            &self.kind
        }

        fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        async fn should_update_registration(&self, _current_token: &str) -> bool {
            self.wants_refresh.load(Ordering::SeqCst)
        }

        async fn start_registration(&self) -> Result<()> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            // 未脚本化的调用视为注册已受理，等待回调
            self.start_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }
    }
}
