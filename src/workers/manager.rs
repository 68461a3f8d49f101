// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::workers::worker::{spawn_periodic, Worker};
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 工作管理器
///
/// 持有所有后台任务的句柄，在收到关闭信号时统一终止
#[derive(Default)]
pub struct WorkerManager {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 启动周期性工作器
    ///
    /// # 参数
    ///
    /// * `worker` - 要启动的工作器
    pub fn start_worker<W>(&mut self, worker: Arc<W>)
    where
        W: Worker + ?Sized + 'static,
    {
        info!("Starting {}", worker.name());
        self.handles.push(spawn_periodic(worker));
    }

    /// 托管一个已经启动的后台任务
    pub fn track(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    /// 当前托管的后台任务数量
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// 终止所有后台任务
    pub fn shutdown(&mut self) {
        info!("Shutting down workers...");
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        info!("Workers shut down successfully");
    }

    /// 等待关闭信号并关闭工作进程
    ///
    /// 监听关闭信号并优雅地关闭所有工作进程
    pub async fn wait_for_shutdown(&mut self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }

        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::WorkerError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingWorker {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Worker for CountingWorker {
        async fn run_once(&self) -> Result<(), WorkerError> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst);
            if run == 0 {
                return Err(WorkerError::ServiceError("first run fails".to_string()));
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "Counting worker"
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(10)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_keeps_running_after_failure_until_shutdown() {
        let worker = Arc::new(CountingWorker {
            runs: AtomicUsize::new(0),
        });
        let mut manager = WorkerManager::new();
        manager.start_worker(worker.clone());
        assert_eq!(manager.len(), 1);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(worker.runs.load(Ordering::SeqCst), 3);

        manager.shutdown();
        assert!(manager.is_empty());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(worker.runs.load(Ordering::SeqCst), 3);
    }
}
