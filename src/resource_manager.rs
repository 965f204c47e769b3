//! Resource management
//!
//! Dataset generation and reduction are CPU-bound, so the number of requests
//! crunching simultaneously is capped by a task semaphore. A slow build of a
//! very large dataset then queues behind the cap instead of starving the
//! runtime of worker threads.

use crate::error::PlotServeError;

use tokio::sync::{Semaphore, SemaphorePermit};

/// [crate::resource_manager::ResourceManager] allocates CPU task slots to
/// requests using a Tokio Semaphore.
#[derive(Debug)]
pub struct ResourceManager {
    /// Optional semaphore for CPU-bound tasks.
    tasks: Option<Semaphore>,
}

impl ResourceManager {
    /// Returns a new ResourceManager object.
    pub fn new(task_limit: Option<usize>) -> Self {
        Self {
            tasks: task_limit.map(Semaphore::new),
        }
    }

    /// Acquire a task resource.
    pub async fn task(&self) -> Result<Option<SemaphorePermit>, PlotServeError> {
        if let Some(tasks) = &self.tasks {
            tasks.acquire().await.map(Some).map_err(|err| err.into())
        } else {
            Ok(None)
        }
    }
}
