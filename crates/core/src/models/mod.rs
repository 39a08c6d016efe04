pub mod channel;
pub mod job;
pub mod mutation;
pub mod payload;
pub mod response;

pub use channel::{ChannelIdentity, RegistrationFinishedEvent};
pub use job::{
    Job, JobAction, JobBuilder, JobExtras, JobResult, EXTRA_PROVIDER_KIND, EXTRA_REGISTRATION_ID,
    EXTRA_TAG_GROUP_MUTATIONS,
};
pub use mutation::{collapse_mutations, TagGroupsMutation};
pub use payload::ChannelRegistrationPayload;
pub use response::ApiResponse;
