pub mod tasks;
#[cfg(feature = "tokio-runtime")]
pub mod driver;

pub use tasks::{PriorityFn, SharedTaskQueue, Task, TaskKey};
#[cfg(feature = "tokio-runtime")]
pub use driver::QueueDriver;
