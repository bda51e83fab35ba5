use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use travel_listings::tasks::{RedisQueue, SmtpMailer, Worker};
use travel_listings::{telemetry, DbOperations, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    telemetry::init("info,sqlx=warn");

    let config = Settings::new()?;

    let db = DbOperations::new_with_options(
        &config.database.url,
        config.database.max_connections,
        Duration::from_secs(5),
    )
    .await?;
    db.migrate().await?;

    let queue = RedisQueue::new(&config.broker.url, &config.broker.queue_name)?;
    let mailer = SmtpMailer::new(&config.email)?;
    info!(
        "Worker consuming {} on {}, sending via {}:{}",
        queue.key(),
        queue.endpoint(),
        config.email.smtp_host,
        config.email.smtp_port
    );

    let worker = Worker::new(
        Arc::new(db.clone()),
        Arc::new(queue),
        Arc::new(mailer),
        &config.worker,
    );

    worker
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await;

    db.close().await;
    Ok(())
}
