use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use registrar_core::{Job, JobDispatcher, JobHandler, JobResult, RegistrarError, Result};

use crate::retry::RetryConfig;

/// 队列中的任务条目，重试次数由分发器维护
#[derive(Debug)]
struct QueueEntry {
    job: Job,
    retry_count: u32,
}

/// 进程内任务分发器句柄，可克隆，跨线程共享。
///
/// 实际执行发生在配对的`JobWorker`中，单worker串行消费保证同一
/// 处理器不会并发执行两个任务。
#[derive(Clone)]
pub struct LocalJobDispatcher {
    tx: mpsc::UnboundedSender<QueueEntry>,
}

#[async_trait]
impl JobDispatcher for LocalJobDispatcher {
    async fn dispatch(&self, job: Job) -> Result<()> {
        debug!("投递任务: {} ({})", job.action, job.id);
        self.tx
            .send(QueueEntry {
                job,
                retry_count: 0,
            })
            .map_err(|_| RegistrarError::Dispatch("任务队列已关闭".to_string()))
    }
}

/// 任务队列的消费端，spawn后独占持有处理器
pub struct JobWorker {
    rx: mpsc::UnboundedReceiver<QueueEntry>,
    retry_tx: mpsc::WeakUnboundedSender<QueueEntry>,
    retry_config: RetryConfig,
}

/// 创建一对分发器句柄与worker
pub fn job_queue(retry_config: RetryConfig) -> (LocalJobDispatcher, JobWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    let worker = JobWorker {
        rx,
        retry_tx: tx.downgrade(),
        retry_config,
    };
    (LocalJobDispatcher { tx }, worker)
}

impl JobWorker {
    /// 启动worker循环。处理器被worker独占持有，返回Retry的任务
    /// 按退避间隔延迟后重新入队；所有分发器句柄释放后循环退出。
    pub fn spawn<H>(mut self, mut handler: H) -> JoinHandle<()>
    where
        H: JobHandler + 'static,
    {
        tokio::spawn(async move {
            while let Some(entry) = self.rx.recv().await {
                let action = entry.job.action;
                let job_id = entry.job.id.clone();
                debug!(
                    "开始执行任务: {action} ({job_id}, 重试次数: {})",
                    entry.retry_count
                );

                match handler.perform_job(entry.job.clone()).await {
                    JobResult::Finished => {
                        debug!("任务执行完成: {action} ({job_id})");
                    }
                    JobResult::Retry => {
                        let delay = self.retry_config.retry_delay(entry.retry_count);
                        info!(
                            "任务请求重试: {action} ({job_id})，{}毫秒后重新入队",
                            delay.as_millis()
                        );

                        let Some(tx) = self.retry_tx.upgrade() else {
                            error!("任务队列已关闭，丢弃重试任务: {action} ({job_id})");
                            continue;
                        };
                        let retry_entry = QueueEntry {
                            job: entry.job,
                            retry_count: entry.retry_count + 1,
                        };
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            if tx.send(retry_entry).is_err() {
                                debug!("任务队列已关闭，丢弃重试任务");
                            }
                        });
                    }
                }
            }
            debug!("任务队列已关闭，worker退出");
        })
    }
}
