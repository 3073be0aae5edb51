use log::{error, info};
use star_tally::db::Database;
use star_tally::tasks;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    // Initialize database
    let database = match Database::new().await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };

    info!("star-tally event lifecycle daemon started");
    tasks::event_closer::close_expired_events_task(database).await;
}
