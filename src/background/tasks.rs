use crate::prelude::{Arc, HashSet, Mutex};
use crate::traits::TaskQueue;
use futures::future::BoxFuture;
use std::cmp::Ordering;
use std::fmt;

/// Unique identifier for a queued tile job
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    pub source: String,
    pub tile: String,
}

impl TaskKey {
    pub fn new(source: impl Into<String>, tile: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            tile: tile.into(),
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.tile)
    }
}

/// Priority function evaluated at every sort; higher runs sooner
pub type PriorityFn = Arc<dyn Fn() -> f64 + Send + Sync>;

/// One outstanding tile-production job
pub struct Task {
    key: TaskKey,
    priority: PriorityFn,
    work: BoxFuture<'static, ()>,
}

impl Task {
    pub fn new(key: TaskKey, priority: PriorityFn, work: BoxFuture<'static, ()>) -> Self {
        Self {
            key,
            priority,
            work,
        }
    }

    pub fn key(&self) -> &TaskKey {
        &self.key
    }

    /// Current priority of the task
    pub fn priority(&self) -> f64 {
        (self.priority)()
    }

    /// Consume the task, yielding the work future for whoever services the queue
    pub fn run(self) -> BoxFuture<'static, ()> {
        self.work
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("key", &self.key)
            .field("priority", &self.priority())
            .finish()
    }
}

/// Internal wrapper remembering enqueue order for tie-breaking
struct QueuedTask {
    task: Task,
    sequence: u64,
}

#[derive(Default)]
struct QueueState {
    tasks: Vec<QueuedTask>,
    keys: HashSet<TaskKey>,
    sequence: u64,
}

/// Mutex-guarded task queue shared by every source
///
/// Tasks wait in the order established by the last [`sort_tasks`](TaskQueue::sort_tasks);
/// anything enqueued since then waits behind them until the next sort.
#[derive(Clone, Default)]
pub struct SharedTaskQueue {
    state: Arc<Mutex<QueueState>>,
}

impl SharedTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in current queue order
    pub fn keys(&self) -> Vec<TaskKey> {
        self.state
            .lock()
            .map(|state| state.tasks.iter().map(|q| q.task.key.clone()).collect())
            .unwrap_or_default()
    }
}

impl TaskQueue for SharedTaskQueue {
    fn enqueue(&self, task: Task) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };

        if !state.keys.insert(task.key.clone()) {
            log::debug!("task {} already queued", task.key);
            return false;
        }

        let sequence = state.sequence;
        state.sequence += 1;
        state.tasks.push(QueuedTask { task, sequence });
        true
    }

    fn sort_tasks(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        // Evaluate each priority once so the comparator sees a consistent snapshot
        let mut scored: Vec<(f64, QueuedTask)> = state
            .tasks
            .drain(..)
            .map(|queued| (queued.task.priority(), queued))
            .collect();

        // Higher priority first, then earlier enqueue
        scored.sort_by(|(a, qa), (b, qb)| match b.total_cmp(a) {
            Ordering::Equal => qa.sequence.cmp(&qb.sequence),
            other => other,
        });

        state.tasks = scored.into_iter().map(|(_, queued)| queued).collect();
        log::debug!("sorted {} queued tasks", state.tasks.len());
    }

    fn count_tasks(&self) -> usize {
        self.state.lock().map(|state| state.tasks.len()).unwrap_or(0)
    }

    fn pop_task(&self) -> Option<Task> {
        let mut state = self.state.lock().ok()?;
        if state.tasks.is_empty() {
            return None;
        }
        let queued = state.tasks.remove(0);
        state.keys.remove(&queued.task.key);
        Some(queued.task)
    }

    fn contains(&self, key: &TaskKey) -> bool {
        self.state
            .lock()
            .map(|state| state.keys.contains(key))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

    fn task(source: &str, tile: &str, priority: f64) -> Task {
        Task::new(
            TaskKey::new(source, tile),
            Arc::new(move || priority),
            Box::pin(async {}),
        )
    }

    #[test]
    fn test_enqueue_is_idempotent_per_key() {
        let queue = SharedTaskQueue::new();
        assert!(queue.enqueue(task("osm", "1/0/0", 1.0)));
        assert!(!queue.enqueue(task("osm", "1/0/0", 5.0)));
        // Same tile key under another source is a different task
        assert!(queue.enqueue(task("sat", "1/0/0", 1.0)));
        assert_eq!(queue.count_tasks(), 2);
    }

    #[test]
    fn test_sort_orders_across_sources() {
        let queue = SharedTaskQueue::new();
        queue.enqueue(task("raster", "2/0/0", -3.0));
        queue.enqueue(task("raster", "2/1/1", -0.5));
        queue.enqueue(task("vector", "2/1/0", -1.0));
        queue.enqueue(task("vector", "2/2/2", -0.1));
        queue.sort_tasks();

        let order: Vec<String> = queue.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(
            order,
            vec!["vector:2/2/2", "raster:2/1/1", "vector:2/1/0", "raster:2/0/0"]
        );
    }

    #[test]
    fn test_ties_keep_enqueue_order() {
        let queue = SharedTaskQueue::new();
        queue.enqueue(task("a", "0/0/0", 0.0));
        queue.enqueue(task("b", "0/0/0", 0.0));
        queue.enqueue(task("c", "0/0/0", 0.0));
        queue.sort_tasks();

        let sources: Vec<String> = queue.keys().into_iter().map(|k| k.source).collect();
        assert_eq!(sources, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_priority_reevaluated_on_sort() {
        let queue = SharedTaskQueue::new();
        let shared = Arc::new(AtomicU64::new(0f64.to_bits()));
        let current = shared.clone();
        queue.enqueue(Task::new(
            TaskKey::new("moving", "3/0/0"),
            Arc::new(move || f64::from_bits(current.load(AtomicOrdering::SeqCst))),
            Box::pin(async {}),
        ));
        queue.enqueue(task("fixed", "3/0/0", 1.0));

        queue.sort_tasks();
        assert_eq!(queue.keys()[0].source, "fixed");

        shared.store(2f64.to_bits(), AtomicOrdering::SeqCst);
        queue.sort_tasks();
        assert_eq!(queue.keys()[0].source, "moving");
    }

    #[test]
    fn test_pop_frees_key_for_reenqueue() {
        let queue = SharedTaskQueue::new();
        queue.enqueue(task("osm", "0/0/0", 0.0));
        let popped = queue.pop_task().unwrap();
        assert_eq!(popped.key(), &TaskKey::new("osm", "0/0/0"));
        assert!(queue.is_empty());
        assert!(!queue.contains(popped.key()));
        assert!(queue.enqueue(task("osm", "0/0/0", 0.0)));
    }

    #[test]
    fn test_nan_priority_does_not_panic() {
        let queue = SharedTaskQueue::new();
        queue.enqueue(task("a", "0/0/0", f64::NAN));
        queue.enqueue(task("b", "0/0/0", 1.0));
        queue.sort_tasks();
        assert_eq!(queue.count_tasks(), 2);
    }
}
