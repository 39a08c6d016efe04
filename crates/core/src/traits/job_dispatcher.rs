use async_trait::async_trait;

use crate::models::{Job, JobResult};
use crate::Result;

/// 任务分发器抽象接口。
///
/// 接受任务描述用于异步、可能延迟的执行；任务返回`Retry`时由分发器
/// 以自有的退避策略重新入队。
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// 投递任务
    async fn dispatch(&self, job: Job) -> Result<()>;
}

/// 任务处理器接口。
///
/// 分发器的单个worker独占持有处理器（`&mut self`），以类型系统表达
/// 同一进程内任务串行执行的约束。
#[async_trait]
pub trait JobHandler: Send {
    /// 执行一个任务，任何路径都以Finished或Retry结束，不会panic
    async fn perform_job(&mut self, job: Job) -> JobResult;
}
