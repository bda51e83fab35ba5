//! Background notification pipeline: the broker seam, email rendering and
//! delivery, and the worker loop that ties them together.

pub mod email;
pub mod queue;
pub mod redis_queue;
pub mod worker;

pub use email::{EmailMessage, Mailer, SmtpMailer};
pub use queue::{enqueue, MemoryQueue, Task, TaskEnvelope, TaskQueue};
pub use redis_queue::RedisQueue;
pub use worker::{TaskOutcome, Worker};
