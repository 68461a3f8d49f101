// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::ValidatorSettings;
use crate::domain::models::validation_result::ValidationResult;
use crate::validator::report_parser::ReportParser;
use crate::validator::traits::{RunnerState, ValidatorEngine, ValidatorError, ValidatorFactory};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempPath;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const INTERRUPTED: &str = "Process has been interrupted";
const GENERATION_PROBLEM: &str = "Some problem in generating result";

/// 外部校验工具的运行参数
#[derive(Debug)]
pub struct ExternalValidatorConfig {
    pub tool_path: PathBuf,
    pub report_dir: PathBuf,
    pub error_log: PathBuf,
    pub timeout: Duration,
    pub required_extension: String,
    pub parser: ReportParser,
}

/// 外部校验器工厂
///
/// 构造时创建报告目录和诊断日志所在目录，失败视为不可恢复的配置错误。
pub struct ExternalValidatorFactory {
    config: Arc<ExternalValidatorConfig>,
}

impl ExternalValidatorFactory {
    pub fn new(settings: &ValidatorSettings) -> Result<Self, ValidatorError> {
        if settings.tool_path.as_os_str().is_empty() {
            return Err(ValidatorError::Configuration(
                "validator tool path is empty".to_string(),
            ));
        }
        if settings.required_extension.is_empty() {
            return Err(ValidatorError::Configuration(
                "required extension is empty".to_string(),
            ));
        }

        fs::create_dir_all(&settings.report_dir)?;
        if let Some(parent) = settings.error_log.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        Ok(Self {
            config: Arc::new(ExternalValidatorConfig {
                tool_path: settings.tool_path.clone(),
                report_dir: settings.report_dir.clone(),
                error_log: settings.error_log.clone(),
                timeout: settings.timeout(),
                required_extension: settings.required_extension.clone(),
                parser: ReportParser::from_settings(settings),
            }),
        })
    }
}

impl ValidatorFactory for ExternalValidatorFactory {
    fn create(&self) -> Arc<dyn ValidatorEngine> {
        Arc::new(ExternalValidator::new(self.config.clone()))
    }
}

/// 单次校验产生的临时文件
#[derive(Default)]
struct Scratch {
    report: Option<TempPath>,
    temp_copy: Option<TempPath>,
}

impl Scratch {
    fn cleanup(&mut self) {
        if let Some(report) = self.report.take() {
            if let Err(e) = report.close() {
                warn!("Report has not been deleted: {}", e);
            }
        }
        if let Some(copy) = self.temp_copy.take() {
            if let Err(e) = copy.close() {
                warn!("Temporary document copy has not been deleted: {}", e);
            }
        }
    }
}

struct Launch {
    child: Child,
    scratch: Scratch,
}

enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// 以子进程方式运行外部校验工具
///
/// 报告写入临时 XML 文件，诊断输出追加到错误日志。无论结果如何，
/// 报告文件和改名副本都会被删除。
pub struct ExternalValidator {
    config: Arc<ExternalValidatorConfig>,
    state: Mutex<RunnerState>,
    cancel: CancellationToken,
    launch: tokio::sync::Mutex<Option<Launch>>,
    failure: Mutex<Option<String>>,
    pid: Mutex<Option<u32>>,
}

impl ExternalValidator {
    pub fn new(config: Arc<ExternalValidatorConfig>) -> Self {
        Self {
            config,
            state: Mutex::new(RunnerState::Idle),
            cancel: CancellationToken::new(),
            launch: tokio::sync::Mutex::new(None),
            failure: Mutex::new(None),
            pid: Mutex::new(None),
        }
    }

    /// 子进程 ID，进程未启动时为空
    pub fn pid(&self) -> Option<u32> {
        *self.pid.lock()
    }

    /// 仅当当前状态为 `from` 时切换到 `to`
    fn advance(&self, from: RunnerState, to: RunnerState) -> bool {
        let mut state = self.state.lock();
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }

    /// 切换到终止状态，已终止时保持不变
    fn settle(&self, to: RunnerState) {
        let mut state = self.state.lock();
        if !state.is_terminal() {
            *state = to;
        }
    }

    async fn launch_process(&self, document: &Path) -> Result<Launch, ValidatorError> {
        let mut scratch = Scratch::default();
        match self.spawn(document, &mut scratch).await {
            Ok(child) => Ok(Launch { child, scratch }),
            Err(e) => {
                scratch.cleanup();
                Err(e)
            }
        }
    }

    async fn spawn(&self, document: &Path, scratch: &mut Scratch) -> Result<Child, ValidatorError> {
        let target = self.prepare_document(document, scratch).await?;

        let (report_file, report_path) = tempfile::Builder::new()
            .prefix("validationReport")
            .suffix(".xml")
            .tempfile_in(&self.config.report_dir)?
            .into_parts();
        scratch.report = Some(report_path);

        let error_log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.error_log)?;

        info!("Starting validator process for file {}", target.display());
        let child = Command::new(&self.config.tool_path)
            .args(["--extract", "--format", "mrr", "--maxfailuresdisplayed", "1"])
            .arg(&target)
            .stdin(Stdio::null())
            .stdout(Stdio::from(report_file))
            .stderr(Stdio::from(error_log))
            .kill_on_drop(true)
            .spawn()?;
        Ok(child)
    }

    /// 扩展名不符合要求时在同目录创建改名副本，原文件保持不变
    async fn prepare_document(
        &self,
        document: &Path,
        scratch: &mut Scratch,
    ) -> Result<PathBuf, ValidatorError> {
        let required = self.config.required_extension.as_str();
        if document.extension().and_then(|e| e.to_str()) == Some(required) {
            return Ok(document.to_path_buf());
        }
        if !document.is_file() {
            return Err(ValidatorError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("document {} does not exist", document.display()),
            )));
        }

        let parent = document
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let copy = tempfile::Builder::new()
            .prefix("tempDocument")
            .suffix(&format!(".{}", required))
            .tempfile_in(parent)?
            .into_temp_path();
        let copy_path = copy.to_path_buf();
        scratch.temp_copy = Some(copy);

        tokio::fs::copy(document, &copy_path).await?;
        debug!(
            "Copied {} to {} for validation",
            document.display(),
            copy_path.display()
        );
        Ok(copy_path)
    }

    async fn kill(&self, child: &mut Child) {
        if let Err(e) = child.kill().await {
            warn!("Failed to kill validator process: {}", e);
        }
    }

    async fn read_report(&self, launch: &Launch) -> ValidationResult {
        let Some(report) = launch.scratch.report.as_ref() else {
            self.settle(RunnerState::Failed);
            return ValidationResult::problem("Some problem in report generation");
        };

        let parsed = match tokio::fs::read_to_string(report).await {
            Ok(xml) => self.config.parser.parse(&xml),
            Err(e) => Err(ValidatorError::Io(e)),
        };
        match parsed {
            Ok(result) => {
                self.advance(RunnerState::Running, RunnerState::Completed);
                result
            }
            Err(e) => {
                info!("{}: {}", GENERATION_PROBLEM, e);
                self.settle(RunnerState::Failed);
                ValidationResult::problem(format!("{}: {}", GENERATION_PROBLEM, e))
            }
        }
    }

    fn unlaunched_result(&self) -> ValidationResult {
        if let Some(message) = self.failure.lock().clone() {
            return ValidationResult::problem(message);
        }
        match self.state() {
            RunnerState::Aborted => {
                ValidationResult::problem(format!("{}: validation aborted", INTERRUPTED))
            }
            RunnerState::Idle => ValidationResult::problem(
                "Some problem in report generation: validator was not started",
            ),
            state => ValidationResult::problem(format!(
                "Some problem in report generation: no running process ({})",
                state
            )),
        }
    }
}

#[async_trait]
impl ValidatorEngine for ExternalValidator {
    async fn start(&self, document: &Path) {
        if !self.advance(RunnerState::Idle, RunnerState::Starting) {
            warn!(
                "Validator for {} not started: state is {}",
                document.display(),
                self.state()
            );
            return;
        }

        match self.launch_process(document).await {
            Ok(launch) => {
                *self.pid.lock() = launch.child.id();
                *self.launch.lock().await = Some(launch);
                self.advance(RunnerState::Starting, RunnerState::Running);
                info!("Validator process has been started");
            }
            Err(e) => {
                error!("Failed to start validator for {}: {}", document.display(), e);
                *self.failure.lock() = Some(format!("{}: {}", GENERATION_PROBLEM, e));
                self.settle(RunnerState::Failed);
            }
        }
    }

    async fn await_result(&self) -> ValidationResult {
        let Some(mut launch) = self.launch.lock().await.take() else {
            return self.unlaunched_result();
        };

        let outcome = tokio::select! {
            status = launch.child.wait() => Outcome::Exited(status),
            _ = tokio::time::sleep(self.config.timeout) => Outcome::TimedOut,
            _ = self.cancel.cancelled() => Outcome::Cancelled,
        };

        let result = match outcome {
            Outcome::Exited(Ok(status)) => {
                debug!("Validator process exited with {}", status);
                if self.cancel.is_cancelled() {
                    ValidationResult::problem(format!("{}: validation aborted", INTERRUPTED))
                } else {
                    self.read_report(&launch).await
                }
            }
            Outcome::Exited(Err(e)) => {
                self.settle(RunnerState::Failed);
                ValidationResult::problem(format!("{}: {}", INTERRUPTED, e))
            }
            Outcome::TimedOut => {
                info!("Validator process has reached timeout. Destroying...");
                self.kill(&mut launch.child).await;
                self.settle(RunnerState::TimedOut);
                ValidationResult::problem(format!(
                    "{}: validation timed out after {:?}",
                    INTERRUPTED, self.config.timeout
                ))
            }
            Outcome::Cancelled => {
                info!("Validator process has been terminated");
                self.kill(&mut launch.child).await;
                ValidationResult::problem(format!("{}: validation aborted", INTERRUPTED))
            }
        };

        launch.scratch.cleanup();
        result
    }

    fn terminate(&self) {
        {
            let mut state = self.state.lock();
            if state.is_terminal() {
                return;
            }
            *state = RunnerState::Aborted;
        }
        self.cancel.cancel();
        info!("Validator termination requested");
    }

    fn state(&self) -> RunnerState {
        *self.state.lock()
    }
}

#[cfg(all(test, unix))]
#[path = "external_test.rs"]
mod tests;
