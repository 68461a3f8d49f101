// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::validation_result::ValidationResult;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// 校验器错误类型
///
/// 只有构造阶段的错误会返回给调用方，运行期错误都会转换为问题结果。
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Unreadable report: {0}")]
    Report(String),
    #[error("Report query failed: {0}")]
    Query(String),
}

/// 单次校验调用的状态
///
/// Idle → Starting → Running → Completed/TimedOut/Aborted/Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Starting,
    Running,
    Completed,
    TimedOut,
    Aborted,
    Failed,
}

impl RunnerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunnerState::Completed
                | RunnerState::TimedOut
                | RunnerState::Aborted
                | RunnerState::Failed
        )
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RunnerState::Idle => write!(f, "idle"),
            RunnerState::Starting => write!(f, "starting"),
            RunnerState::Running => write!(f, "running"),
            RunnerState::Completed => write!(f, "completed"),
            RunnerState::TimedOut => write!(f, "timed_out"),
            RunnerState::Aborted => write!(f, "aborted"),
            RunnerState::Failed => write!(f, "failed"),
        }
    }
}

/// 校验执行器
///
/// 每个实例只执行一次校验。`await_result` 总是返回一个结果，失败时为问题结果。
#[async_trait]
pub trait ValidatorEngine: Send + Sync {
    /// 启动校验，拿到进程句柄后立即返回
    async fn start(&self, document: &Path);
    /// 等待校验结束并返回结果
    async fn await_result(&self) -> ValidationResult;
    /// 终止校验，可重复调用
    fn terminate(&self);
    /// 当前状态
    fn state(&self) -> RunnerState;
}

/// 校验执行器工厂
pub trait ValidatorFactory: Send + Sync {
    fn create(&self) -> Arc<dyn ValidatorEngine>;
}
