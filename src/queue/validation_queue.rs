// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::validation_job::ValidationJobStatus;
use crate::domain::models::validation_result::ValidationResult;
use crate::domain::repositories::crawl_job_repository::RepositoryError;
use crate::domain::repositories::validation_job_repository::ValidationJobRepository;
use crate::domain::services::validation_scheduler::ValidationScheduler;
use crate::queue::validator_task::ValidatorTask;
use crate::validator::traits::ValidatorFactory;
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// 校验任务队列管理器
///
/// 同一时刻最多有 `thread_count` 个校验任务处于 IN_PROGRESS。
/// 所有调度决定都在同一把锁内完成，校验本身在锁外运行。
pub struct ValidationQueueManager<R>
where
    R: ValidationJobRepository + 'static,
{
    repository: Arc<R>,
    validator_factory: Arc<dyn ValidatorFactory>,
    thread_count: usize,
    tick_interval: Duration,
    in_flight: Mutex<Vec<Arc<ValidatorTask>>>,
    slot_freed: Notify,
}

impl<R> ValidationQueueManager<R>
where
    R: ValidationJobRepository + 'static,
{
    /// 创建新的队列管理器
    ///
    /// # 参数
    ///
    /// * `repository` - 校验任务仓库
    /// * `validator_factory` - 每个任务使用一个新的校验执行器
    /// * `thread_count` - 并发上限，至少为 1
    /// * `tick_interval` - 定时补位间隔
    pub fn new(
        repository: Arc<R>,
        validator_factory: Arc<dyn ValidatorFactory>,
        thread_count: usize,
        tick_interval: Duration,
    ) -> Self {
        Self {
            repository,
            validator_factory,
            thread_count: thread_count.max(1),
            tick_interval,
            in_flight: Mutex::new(Vec::new()),
            slot_freed: Notify::new(),
        }
    }

    /// 启动前的崩溃恢复：把遗留的 IN_PROGRESS 任务重置为未开始
    pub async fn init(&self) -> Result<u64, QueueError> {
        let reset = self.repository.reset_in_progress().await?;
        if reset > 0 {
            info!("Reset {} validation jobs left in progress", reset);
        }
        Ok(reset)
    }

    /// 尝试调度下一个任务
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(task))` - 已提交的任务
    /// * `Ok(None)` - 没有空闲槽位或没有可调度的任务
    pub async fn dispatch_next(self: &Arc<Self>) -> Result<Option<Arc<ValidatorTask>>, QueueError> {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.len() >= self.thread_count {
            return Ok(None);
        }

        let Some(job) = self.repository.acquire_next().await? else {
            return Ok(None);
        };

        debug!("Dispatching validation job {} ({})", job.id, job.document_url);
        let task = Arc::new(ValidatorTask::new(job, self.validator_factory.create()));
        in_flight.push(task.clone());
        metrics::counter!("validation_jobs_dispatched_total").increment(1);
        metrics::gauge!("validation_jobs_in_flight").set(in_flight.len() as f64);

        self.submit(task.clone());
        Ok(Some(task))
    }

    /// 持续调度直到没有空闲槽位或没有任务
    ///
    /// # 返回值
    ///
    /// 本次调度的任务数
    pub async fn fill_free_slots(self: &Arc<Self>) -> usize {
        let mut dispatched = 0;
        loop {
            match self.dispatch_next().await {
                Ok(Some(_)) => dispatched += 1,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to dispatch validation job: {}", e);
                    break;
                }
            }
        }
        dispatched
    }

    /// 中止属于某个爬取任务的所有运行中校验
    ///
    /// # 返回值
    ///
    /// 被中止的任务数
    pub async fn abort(&self, crawl_job_id: Uuid) -> usize {
        let in_flight = self.in_flight.lock().await;
        let mut aborted = 0;
        for task in in_flight
            .iter()
            .filter(|task| task.job().crawl_job_id == crawl_job_id)
        {
            task.abort();
            aborted += 1;
        }
        if aborted > 0 {
            info!(
                "Aborted {} running validations of crawl job {}",
                aborted, crawl_job_id
            );
        }
        aborted
    }

    /// 当前运行中的任务数
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    /// 唤醒调度循环，例如有新任务入队时
    pub fn wake(&self) {
        self.slot_freed.notify_one();
    }

    /// 启动调度循环
    ///
    /// 循环在定时器触发或有槽位释放时补满空闲槽位。
    ///
    /// # 返回值
    ///
    /// 返回后台任务的句柄
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(manager.tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                "Validation dispatcher started with {} slots",
                manager.thread_count
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = manager.slot_freed.notified() => {}
                }
                manager.fill_free_slots().await;
            }
        })
    }

    fn submit(self: &Arc<Self>, task: Arc<ValidatorTask>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let result = match AssertUnwindSafe(task.run()).catch_unwind().await {
                Ok(result) => result,
                Err(_) => {
                    error!("Validation of job {} panicked", task.job().id);
                    ValidationResult::problem(
                        "Some problem in generating result: validator panicked",
                    )
                }
            };
            manager.complete(&task, result).await;
        });
    }

    /// 完成回调
    ///
    /// 中止检查与结果保存在同一把锁内完成。
    async fn complete(&self, task: &Arc<ValidatorTask>, result: ValidationResult) {
        let mut in_flight = self.in_flight.lock().await;
        let job = task.job();

        if task.status() == ValidationJobStatus::Aborted {
            info!("Validation job {} was aborted, result discarded", job.id);
            metrics::counter!("validation_jobs_aborted_total").increment(1);
            if let Err(e) = self
                .repository
                .set_status(job.id, ValidationJobStatus::Aborted)
                .await
            {
                error!("Failed to mark validation job {} aborted: {}", job.id, e);
            }
        } else {
            match self.repository.save_result(job, &result).await {
                Ok(true) => {
                    info!(
                        "Validation job {} finished with result {}",
                        job.id, result.test_result
                    );
                    metrics::counter!("validation_jobs_completed_total").increment(1);
                }
                Ok(false) => warn!(
                    "Validation job {} is no longer in progress, result discarded",
                    job.id
                ),
                Err(e) => {
                    error!("Failed to save result of validation job {}: {}", job.id, e);
                    // back to the queue so the job is validated again
                    if let Err(e) = self
                        .repository
                        .set_status(job.id, ValidationJobStatus::NotStarted)
                        .await
                    {
                        error!("Failed to requeue validation job {}: {}", job.id, e);
                    }
                }
            }
        }

        in_flight.retain(|t| !Arc::ptr_eq(t, task));
        metrics::gauge!("validation_jobs_in_flight").set(in_flight.len() as f64);
        drop(in_flight);
        self.slot_freed.notify_one();
    }
}

#[async_trait]
impl<R> ValidationScheduler for ValidationQueueManager<R>
where
    R: ValidationJobRepository + 'static,
{
    async fn abort_crawl_job(&self, crawl_job_id: Uuid) -> usize {
        self.abort(crawl_job_id).await
    }

    fn wake(&self) {
        ValidationQueueManager::wake(self);
    }
}

#[cfg(test)]
#[path = "validation_queue_test.rs"]
mod tests;
