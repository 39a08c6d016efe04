pub mod local_dispatcher;
pub mod retry;

pub use local_dispatcher::{job_queue, JobWorker, LocalJobDispatcher};
pub use retry::RetryConfig;
