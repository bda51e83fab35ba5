use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::error::QueueError;

/// Background jobs understood by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    SendBookingConfirmation { booking_id: Uuid },
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::SendBookingConfirmation { .. } => "send_booking_confirmation",
        }
    }
}

/// A task plus delivery metadata, as stored on the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub id: Uuid,
    #[serde(flatten)]
    pub task: Task,
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl TaskEnvelope {
    pub fn new(task: Task) -> Self {
        Self {
            id: Uuid::new_v4(),
            task,
            attempts: 0,
            enqueued_at: Utc::now(),
        }
    }

    /// The same task, marked for another delivery attempt.
    pub fn retried(mut self) -> Self {
        self.attempts += 1;
        self.enqueued_at = Utc::now();
        self
    }
}

/// FIFO broker seam. `pop` waits at most `timeout` for a message.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn push(&self, envelope: TaskEnvelope) -> Result<(), QueueError>;
    async fn pop(&self, timeout: Duration) -> Result<Option<TaskEnvelope>, QueueError>;
}

/// Wraps `task` in a fresh envelope and pushes it, returning the envelope id.
pub async fn enqueue(queue: &dyn TaskQueue, task: Task) -> Result<Uuid, QueueError> {
    let envelope = TaskEnvelope::new(task);
    let id = envelope.id;
    queue.push(envelope).await?;
    Ok(id)
}

/// In-process queue for tests and single-process development.
#[derive(Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<TaskEnvelope>>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of queued envelopes, oldest first.
    pub fn pending(&self) -> Vec<TaskEnvelope> {
        self.items
            .lock()
            .map(|items| items.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn try_pop(&self) -> Result<Option<TaskEnvelope>, QueueError> {
        self.items
            .lock()
            .map(|mut items| items.pop_front())
            .map_err(|e| QueueError::Connection(e.to_string()))
    }
}

#[async_trait]
impl TaskQueue for MemoryQueue {
    async fn push(&self, envelope: TaskEnvelope) -> Result<(), QueueError> {
        self.items
            .lock()
            .map_err(|e| QueueError::Connection(e.to_string()))?
            .push_back(envelope);
        self.notify.notify_one();
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<TaskEnvelope>, QueueError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(envelope) = self.try_pop()? {
                return Ok(Some(envelope));
            }
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return self.try_pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_wire_format_is_flat() {
        let booking_id = Uuid::new_v4();
        let envelope = TaskEnvelope::new(Task::SendBookingConfirmation { booking_id });
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["task"], "send_booking_confirmation");
        assert_eq!(json["booking_id"], booking_id.to_string());
        assert_eq!(json["attempts"], 0);

        let back: TaskEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn retried_bumps_attempts() {
        let envelope = TaskEnvelope::new(Task::SendBookingConfirmation {
            booking_id: Uuid::new_v4(),
        });
        let id = envelope.id;
        let retried = envelope.retried().retried();
        assert_eq!(retried.attempts, 2);
        assert_eq!(retried.id, id);
    }

    #[tokio::test]
    async fn memory_queue_is_fifo() {
        let queue = MemoryQueue::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        enqueue(&queue, Task::SendBookingConfirmation { booking_id: first }).await.unwrap();
        enqueue(&queue, Task::SendBookingConfirmation { booking_id: second }).await.unwrap();
        assert_eq!(queue.len(), 2);

        let popped = queue.pop(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(popped.task, Task::SendBookingConfirmation { booking_id: first });
        let popped = queue.pop(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(popped.task, Task::SendBookingConfirmation { booking_id: second });
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn pop_times_out_on_empty_queue() {
        let queue = MemoryQueue::new();
        let popped = queue.pop(Duration::from_millis(20)).await.unwrap();
        assert!(popped.is_none());
    }

    #[tokio::test]
    async fn pop_wakes_on_push() {
        let queue = std::sync::Arc::new(MemoryQueue::new());
        let producer = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            enqueue(producer.as_ref(), Task::SendBookingConfirmation {
                booking_id: Uuid::nil(),
            })
            .await
            .unwrap();
        });

        let popped = queue.pop(Duration::from_secs(5)).await.unwrap();
        assert!(popped.is_some());
    }
}
