// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::validation_job::{ValidationJob, ValidationJobStatus};
use crate::domain::models::validation_result::ValidationResult;
use crate::validator::traits::ValidatorEngine;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument};

/// 校验任务
///
/// 把一个校验任务绑定到一次校验执行。中止后的任务由队列管理器在完成时丢弃结果。
pub struct ValidatorTask {
    job: ValidationJob,
    engine: Arc<dyn ValidatorEngine>,
    aborted: AtomicBool,
}

impl ValidatorTask {
    pub fn new(job: ValidationJob, engine: Arc<dyn ValidatorEngine>) -> Self {
        Self {
            job,
            engine,
            aborted: AtomicBool::new(false),
        }
    }

    pub fn job(&self) -> &ValidationJob {
        &self.job
    }

    /// 执行校验
    ///
    /// # 返回值
    ///
    /// 校验结果，任何失败都表现为问题结果
    #[instrument(skip(self), fields(job_id = %self.job.id, url = %self.job.document_url))]
    pub async fn run(&self) -> ValidationResult {
        let Some(file_path) = self.job.file_path.as_deref() else {
            return ValidationResult::problem(
                "Some problem in generating result: document has no local file",
            );
        };

        self.engine.start(Path::new(file_path)).await;
        self.engine.await_result().await
    }

    /// 中止任务
    ///
    /// 通知校验执行器终止，并把任务状态标记为 ABORTED。
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.engine.terminate();
        info!("Validation job {} aborted", self.job.id);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// 任务当前在调度层面的状态
    pub fn status(&self) -> ValidationJobStatus {
        if self.is_aborted() {
            ValidationJobStatus::Aborted
        } else {
            ValidationJobStatus::InProgress
        }
    }
}
