use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::db::Repository;
use crate::error::{AppError, QueueError};
use crate::tasks::email::{render_booking_confirmation, Mailer};
use crate::tasks::queue::{Task, TaskEnvelope, TaskQueue};

/// What happened to a single dequeued envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Sent,
    /// The referenced record no longer exists; nothing to do.
    Skipped(String),
    /// Pushed back onto the queue for another attempt.
    Retried { attempts: u32 },
    /// Retry budget exhausted.
    Dropped(String),
}

pub struct Worker {
    repo: Arc<dyn Repository>,
    queue: Arc<dyn TaskQueue>,
    mailer: Arc<dyn Mailer>,
    max_retries: u32,
    poll_timeout: Duration,
}

impl Worker {
    pub fn new(
        repo: Arc<dyn Repository>,
        queue: Arc<dyn TaskQueue>,
        mailer: Arc<dyn Mailer>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            repo,
            queue,
            mailer,
            max_retries: config.max_retries,
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
        }
    }

    /// Processes until `shutdown` resolves. Shutdown is only observed between
    /// polls, so an envelope already taken off the broker is always handled.
    /// Broker errors back off and retry.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Worker started (max_retries={})", self.max_retries);

        loop {
            if shutdown.as_mut().now_or_never().is_some() {
                break;
            }
            if let Err(e) = self.run_once().await {
                error!("Failed to poll task queue: {}", e);
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(self.poll_timeout) => {}
                }
            }
        }
        info!("Worker shutting down");
    }

    /// Waits up to the poll timeout for one envelope and handles it.
    pub async fn run_once(&self) -> Result<Option<TaskOutcome>, QueueError> {
        match self.queue.pop(self.poll_timeout).await? {
            Some(envelope) => Ok(Some(self.handle(envelope).await)),
            None => Ok(None),
        }
    }

    pub async fn handle(&self, envelope: TaskEnvelope) -> TaskOutcome {
        let result = match &envelope.task {
            Task::SendBookingConfirmation { booking_id } => {
                self.send_booking_confirmation(*booking_id).await
            }
        };

        match result {
            Ok(None) => {
                info!("Task {} ({}) completed", envelope.task.name(), envelope.id);
                TaskOutcome::Sent
            }
            Ok(Some(reason)) => {
                warn!("Task {} ({}) skipped: {}", envelope.task.name(), envelope.id, reason);
                TaskOutcome::Skipped(reason)
            }
            Err(e) if envelope.attempts < self.max_retries => {
                let retry = envelope.retried();
                let attempts = retry.attempts;
                warn!(
                    "Task {} ({}) failed on attempt {}: {}",
                    retry.task.name(),
                    retry.id,
                    attempts,
                    e
                );
                match self.queue.push(retry).await {
                    Ok(()) => TaskOutcome::Retried { attempts },
                    Err(push_err) => {
                        error!("Could not requeue task: {}", push_err);
                        TaskOutcome::Dropped(push_err.to_string())
                    }
                }
            }
            Err(e) => {
                error!(
                    "Task {} ({}) dropped after {} retries: {}",
                    envelope.task.name(),
                    envelope.id,
                    envelope.attempts,
                    e
                );
                TaskOutcome::Dropped(e.to_string())
            }
        }
    }

    /// `Ok(Some(reason))` means there was nothing to send.
    async fn send_booking_confirmation(&self, booking_id: Uuid) -> Result<Option<String>, AppError> {
        let Some(booking) = self.repo.get_booking(booking_id).await? else {
            return Ok(Some(format!("booking {} not found", booking_id)));
        };
        let Some(listing) = self.repo.get_listing(booking.listing_id).await? else {
            return Ok(Some(format!("listing {} not found", booking.listing_id)));
        };
        let Some(guest) = self.repo.get_user_by_id(booking.user_id).await? else {
            return Ok(Some(format!("user {} not found", booking.user_id)));
        };

        let message = render_booking_confirmation(&booking, &listing, &guest);
        self.mailer.send(message).await?;
        Ok(None)
    }
}
