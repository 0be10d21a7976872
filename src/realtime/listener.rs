// src/realtime/listener.rs

use std::time::Duration;

use sqlx::{PgPool, postgres::PgListener};
use tokio::task::JoinHandle;

use crate::realtime::{ChangeEvent, feed::ChangeFeed};

/// Channel the `quizdesk_notify_change` trigger publishes on.
pub const CHANNEL: &str = "quizdesk_changes";

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Bridges Postgres notifications into the feed until the task is aborted.
pub fn spawn(pool: PgPool, feed: ChangeFeed) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = listen(&pool, &feed).await {
                tracing::error!("Realtime listener failed: {:?}", e);
            }
            tracing::warn!("Reconnecting realtime listener in {:?}", RECONNECT_DELAY);
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    })
}

async fn listen(pool: &PgPool, feed: &ChangeFeed) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANNEL).await?;
    tracing::info!("Listening for row changes on '{}'", CHANNEL);

    loop {
        let notification = listener.recv().await?;
        match parse_payload(notification.payload()) {
            Ok(event) => feed.publish(event),
            Err(e) => tracing::warn!("Dropping malformed change payload: {}", e),
        }
    }
}

pub fn parse_payload(payload: &str) -> Result<ChangeEvent, serde_json::Error> {
    serde_json::from_str(payload)
}
