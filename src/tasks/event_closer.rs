use crate::db::Database;
use crate::error::Result;
use crate::models::EventStatus;
use crate::voting::results::event_results;
use chrono::{DateTime, Utc};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::time::interval;

const CHECK_INTERVAL_SECONDS: u64 = 60; // Check every 60 seconds

pub async fn close_expired_events_task(database: Arc<Database>) {
    info!("Starting background task to close expired events...");
    let mut interval = interval(StdDuration::from_secs(CHECK_INTERVAL_SECONDS));

    loop {
        interval.tick().await; // Wait for the next interval tick
        if let Err(e) = close_due_events(&database, Utc::now()).await {
            error!("Failed to query for expired events: {}", e);
        }
    }
}

// Close every open event whose voting window has elapsed. One event failing
// does not stop the rest; returns the ids that were closed.
pub async fn close_due_events(database: &Database, now: DateTime<Utc>) -> Result<Vec<String>> {
    let expired = database.get_expired_open_events(now).await?;
    if !expired.is_empty() {
        info!("Found {} expired event(s).", expired.len());
    }

    let mut closed = Vec::new();
    for event in expired {
        info!("Closing expired event: {} ({})", event.title, event.id);
        match close_event(database, &event.id).await {
            Ok(()) => closed.push(event.id),
            Err(e) => error!("Error closing event {}: {}", event.id, e),
        }
    }
    Ok(closed)
}

async fn close_event(database: &Database, event_id: &str) -> Result<()> {
    database
        .set_event_status(event_id, EventStatus::Closed)
        .await?;

    let standings = event_results(database, event_id).await?;
    match serde_json::to_string(&standings) {
        Ok(json) => info!("Final standings for event {}: {}", event_id, json),
        Err(e) => error!("Could not serialize standings for event {}: {}", event_id, e),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Event, Item, Vote};
    use chrono::Duration;

    #[tokio::test]
    async fn closes_only_past_due_open_events() {
        let db = Database::in_memory().await.unwrap();
        let now = Utc::now();

        let mut finished = Event::new(
            "Finished".to_string(),
            None,
            "admin-1".to_string(),
            now - Duration::hours(2),
            now - Duration::hours(1),
        );
        finished.status = EventStatus::Open;
        db.create_event(&finished).await.unwrap();

        let category = Category::new(finished.id.clone(), "Best Game".to_string());
        db.add_category(&category).await.unwrap();
        let item = Item::new(category.id.clone(), "Alpha".to_string(), None);
        db.add_item(&item).await.unwrap();
        db.upsert_vote(&Vote::new("u1".to_string(), item.id.clone(), 5))
            .await
            .unwrap();

        let mut running = Event::new(
            "Running".to_string(),
            None,
            "admin-1".to_string(),
            now - Duration::hours(1),
            now + Duration::hours(1),
        );
        running.status = EventStatus::Open;
        db.create_event(&running).await.unwrap();

        let closed = close_due_events(&db, now).await.unwrap();
        assert_eq!(closed, vec![finished.id.clone()]);

        assert_eq!(
            db.get_event(&finished.id).await.unwrap().status,
            EventStatus::Closed
        );
        assert_eq!(
            db.get_event(&running.id).await.unwrap().status,
            EventStatus::Open
        );

        // A second sweep finds nothing left to close
        assert!(close_due_events(&db, now).await.unwrap().is_empty());
    }
}
