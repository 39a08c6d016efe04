pub mod channel_job_handler;
pub mod registration_state;
pub mod tag_store;

pub use channel_job_handler::{ChannelJobHandler, ChannelJobHandlerBuilder};
pub use registration_state::{DeviceSettings, RegistrationState};
pub use tag_store::TagMutationStore;

#[cfg(test)]
mod test_utils;
