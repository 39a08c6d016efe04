pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use config::{ApiConfig, AppConfig, ChannelConfig, DatabaseConfig, RetryPolicyConfig};
pub use errors::{RegistrarError, Result};
pub use models::{
    collapse_mutations, ApiResponse, ChannelIdentity, ChannelRegistrationPayload, Job, JobAction,
    JobBuilder, JobExtras, JobResult, RegistrationFinishedEvent,
    TagGroupsMutation, EXTRA_PROVIDER_KIND, EXTRA_REGISTRATION_ID, EXTRA_TAG_GROUP_MUTATIONS,
};
pub use traits::{
    ChannelApiClient, HostCallbacks, JobDispatcher, JobHandler, KeyValueStore,
    NoopHostCallbacks, NoopRegistrationListener, PushProvider, RegistrationListener,
};
