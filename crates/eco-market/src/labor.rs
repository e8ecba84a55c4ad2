//! The labor market: a FIFO queue of workers looking for an employer.
//!
//! Workers append a contract when they become idle; employers shift one
//! off the head. An empty queue is a normal answer, not something to wait
//! for.

use std::collections::VecDeque;

use tokio::sync::Mutex;
use tracing::debug;

use eco_types::AgentId;

use crate::mailbox::Mailbox;

/// A worker's offer of labor.
#[derive(Debug, Clone)]
pub struct LaborContract {
    /// The worker.
    pub worker: AgentId,
    /// Worker display name.
    pub worker_name: String,
    /// Where wages and the employment notice are sent.
    pub mailbox: Mailbox,
}

impl LaborContract {
    /// Create a contract for the owner of `mailbox`.
    pub fn new(worker_name: impl Into<String>, mailbox: Mailbox) -> Self {
        Self {
            worker: mailbox.owner(),
            worker_name: worker_name.into(),
            mailbox,
        }
    }
}

/// Shared FIFO of labor contracts.
#[derive(Debug, Default)]
pub struct LaborMarket {
    queue: Mutex<VecDeque<LaborContract>>,
}

impl LaborMarket {
    /// Create an empty labor market.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contract at the tail.
    pub async fn append(&self, contract: LaborContract) {
        debug!(worker = %contract.worker_name, "seeking employment");
        self.queue.lock().await.push_back(contract);
    }

    /// Take the oldest contract, or `None` if nobody is looking for work.
    pub async fn shift(&self) -> Option<LaborContract> {
        self.queue.lock().await.pop_front()
    }

    /// Copy of the queue, oldest first.
    pub async fn read(&self) -> Vec<LaborContract> {
        self.queue.lock().await.iter().cloned().collect()
    }

    /// Number of workers waiting.
    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Whether nobody is waiting.
    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }
}
