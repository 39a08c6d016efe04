pub mod callbacks;
pub mod channel_client;
pub mod data_store;
pub mod job_dispatcher;
pub mod push_provider;

pub use callbacks::{
    HostCallbacks, NoopHostCallbacks, NoopRegistrationListener, RegistrationListener,
};
pub use channel_client::ChannelApiClient;
pub use data_store::KeyValueStore;
pub use job_dispatcher::{JobDispatcher, JobHandler};
pub use push_provider::PushProvider;
