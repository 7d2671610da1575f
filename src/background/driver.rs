use crate::background::tasks::TaskKey;
use crate::core::config::DriverConfig;
use crate::prelude::{Arc, Duration};
use crate::traits::TaskQueue;
use crate::{Error, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Services a task queue in the background with bounded concurrency
///
/// The driver only takes tasks from the front of the queue; the order itself
/// is whatever the last `sort_tasks` established.
pub struct QueueDriver {
    completed_rx: Receiver<TaskKey>,
    shutdown_signal: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

impl QueueDriver {
    /// Start servicing `queue` on the current tokio runtime
    pub fn spawn(queue: Arc<dyn TaskQueue>, config: DriverConfig) -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;
        let (completed_tx, completed_rx) = unbounded();
        let shutdown_signal = Arc::new(AtomicBool::new(false));

        log::debug!(
            "QueueDriver starting with max_concurrent: {}",
            config.max_concurrent
        );

        let worker = handle.spawn(Self::worker_loop(
            queue,
            completed_tx,
            config,
            shutdown_signal.clone(),
        ));

        Ok(Self {
            completed_rx,
            shutdown_signal,
            worker,
        })
    }

    /// Keys of tasks finished since the last call (non-blocking)
    pub fn try_recv_completed(&self) -> Vec<TaskKey> {
        self.completed_rx.try_iter().collect()
    }

    /// Stop taking new tasks; running ones finish on their own
    pub fn shutdown(&self) {
        log::debug!("QueueDriver shutdown requested");
        self.shutdown_signal.store(true, AtomicOrdering::SeqCst);
    }

    /// Whether the servicing loop has exited
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    async fn worker_loop(
        queue: Arc<dyn TaskQueue>,
        completed_tx: Sender<TaskKey>,
        config: DriverConfig,
        shutdown_signal: Arc<AtomicBool>,
    ) {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        let idle = Duration::from_millis(config.idle_delay_ms.max(1));

        loop {
            if shutdown_signal.load(AtomicOrdering::SeqCst) {
                log::debug!("QueueDriver exiting - shutdown signalled");
                break;
            }

            // Fill every free slot from the front of the queue
            while let Ok(permit) = semaphore.clone().try_acquire_owned() {
                let Some(task) = queue.pop_task() else {
                    break;
                };

                let key = task.key().clone();
                let completed_tx = completed_tx.clone();
                log::debug!("running task {}", key);

                tokio::spawn(async move {
                    task.run().await;
                    let _ = completed_tx.send(key);
                    drop(permit);
                });
            }

            tokio::time::sleep(idle).await;
        }
    }
}

impl Drop for QueueDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::tasks::{SharedTaskQueue, Task};
    use crate::prelude::Instant;
    use futures::FutureExt;
    use std::sync::atomic::AtomicUsize;

    fn counting_task(tile: &str, running: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> Task {
        Task::new(
            TaskKey::new("osm", tile),
            Arc::new(|| 0.0),
            async move {
                let now = running.fetch_add(1, AtomicOrdering::SeqCst) + 1;
                peak.fetch_max(now, AtomicOrdering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, AtomicOrdering::SeqCst);
            }
            .boxed(),
        )
    }

    async fn wait_for(driver: &QueueDriver, count: usize) -> Vec<TaskKey> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut completed = Vec::new();
        while completed.len() < count && Instant::now() < deadline {
            completed.extend(driver.try_recv_completed());
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        completed
    }

    #[test]
    fn test_spawn_outside_runtime_is_an_error() {
        let queue = Arc::new(SharedTaskQueue::new());
        let result = QueueDriver::spawn(queue, DriverConfig::default());
        assert!(matches!(result, Err(Error::Runtime(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let queue = Arc::new(SharedTaskQueue::new());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for i in 0..8 {
            queue.enqueue(counting_task(&format!("0/{}/0", i), running.clone(), peak.clone()));
        }

        let config = DriverConfig {
            max_concurrent: 2,
            idle_delay_ms: 1,
        };
        let driver = QueueDriver::spawn(queue.clone(), config).unwrap();
        let completed = wait_for(&driver, 8).await;

        assert_eq!(completed.len(), 8);
        assert!(peak.load(AtomicOrdering::SeqCst) <= 2);
        assert_eq!(queue.count_tasks(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_taking_tasks() {
        let queue = Arc::new(SharedTaskQueue::new());
        let driver = QueueDriver::spawn(queue.clone(), DriverConfig::default()).unwrap();
        driver.shutdown();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !driver.is_finished() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(driver.is_finished());

        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        queue.enqueue(counting_task("0/0/0", running, peak));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(queue.count_tasks(), 1);
    }
}
