use crate::db::Database;
use crate::error::{Result, TallyError};
use crate::models::Vote;
use log::{info, warn};

pub const MAX_STARS: i32 = 5;

/// One entry of a multi-item ballot.
#[derive(Debug, Clone)]
pub struct Ballot {
    pub item_id: String,
    pub stars: i32,
}

/// Record a single star rating, replacing any earlier rating by the same
/// user for the same item.
pub async fn submit_vote(db: &Database, user_id: &str, item_id: &str, stars: i32) -> Result<Vote> {
    if user_id.is_empty() {
        return Err(TallyError::validation("user_id", "missing voter identifier"));
    }
    if item_id.is_empty() {
        return Err(TallyError::validation("item_id", "missing item identifier"));
    }
    if !(0..=MAX_STARS).contains(&stars) {
        warn!("Rejecting star rating outside 0-{MAX_STARS} range: {stars}");
        return Err(TallyError::validation(
            "stars",
            format!("{stars} is outside the 0-{MAX_STARS} range"),
        ));
    }

    let stored = db
        .upsert_vote(&Vote::new(user_id.to_string(), item_id.to_string(), stars))
        .await?;
    info!("Recorded vote: user_id={user_id}, item_id={item_id}, stars={stars}");
    Ok(stored)
}

/// Apply a ballot entry per item, in order. An entry that fails does not
/// stop the rest; the returned vector reports each outcome in submission
/// order so callers can tell which votes were saved.
pub async fn submit_votes(db: &Database, user_id: &str, ballots: &[Ballot]) -> Vec<Result<Vote>> {
    let mut outcomes = Vec::with_capacity(ballots.len());
    for ballot in ballots {
        let outcome = submit_vote(db, user_id, &ballot.item_id, ballot.stars).await;
        if let Err(e) = &outcome {
            warn!("Ballot entry for item {} failed: {}", ballot.item_id, e);
        }
        outcomes.push(outcome);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Event, Item};
    use chrono::{Duration, Utc};

    async fn seed_item(db: &Database) -> (Item, Item) {
        let now = Utc::now();
        let event = Event::new(
            "Expo".to_string(),
            None,
            "admin-1".to_string(),
            now - Duration::hours(1),
            now + Duration::hours(1),
        );
        db.create_event(&event).await.unwrap();
        let category = Category::new(event.id.clone(), "Best Game".to_string());
        db.add_category(&category).await.unwrap();
        let item_a = Item::new(category.id.clone(), "Alpha".to_string(), None);
        let item_b = Item::new(category.id.clone(), "Beta".to_string(), None);
        db.add_item(&item_a).await.unwrap();
        db.add_item(&item_b).await.unwrap();
        (item_a, item_b)
    }

    #[tokio::test]
    async fn out_of_range_stars_are_rejected_before_the_store() {
        let db = Database::in_memory().await.unwrap();
        let (item, _) = seed_item(&db).await;

        for bad in [-1, 6, 42] {
            let err = submit_vote(&db, "voter-1", &item.id, bad).await.unwrap_err();
            assert!(matches!(err, TallyError::Validation { field: "stars", .. }));
        }
        assert!(db.get_item_votes(&item.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_stars_is_a_valid_rating() {
        let db = Database::in_memory().await.unwrap();
        let (item, _) = seed_item(&db).await;

        let vote = submit_vote(&db, "voter-1", &item.id, 0).await.unwrap();
        assert_eq!(vote.stars, 0);
    }

    #[tokio::test]
    async fn missing_identifiers_are_rejected() {
        let db = Database::in_memory().await.unwrap();
        let (item, _) = seed_item(&db).await;

        assert!(matches!(
            submit_vote(&db, "", &item.id, 3).await.unwrap_err(),
            TallyError::Validation { field: "user_id", .. }
        ));
        assert!(matches!(
            submit_vote(&db, "voter-1", "", 3).await.unwrap_err(),
            TallyError::Validation { field: "item_id", .. }
        ));
    }

    #[tokio::test]
    async fn resubmitting_the_same_rating_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let (item, _) = seed_item(&db).await;

        submit_vote(&db, "voter-1", &item.id, 4).await.unwrap();
        submit_vote(&db, "voter-1", &item.id, 4).await.unwrap();

        let votes = db.get_item_votes(&item.id).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].stars, 4);
    }

    #[tokio::test]
    async fn resubmitting_overwrites_the_earlier_rating() {
        let db = Database::in_memory().await.unwrap();
        let (item, _) = seed_item(&db).await;

        submit_vote(&db, "voter-1", &item.id, 3).await.unwrap();
        submit_vote(&db, "voter-1", &item.id, 5).await.unwrap();

        let votes = db.get_item_votes(&item.id).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].stars, 5);
    }

    #[tokio::test]
    async fn batch_continues_past_a_failing_entry() {
        let db = Database::in_memory().await.unwrap();
        let (item_a, item_b) = seed_item(&db).await;

        let ballots = vec![
            Ballot { item_id: item_a.id.clone(), stars: 6 },
            Ballot { item_id: item_b.id.clone(), stars: 3 },
        ];
        let outcomes = submit_votes(&db, "voter-1", &ballots).await;

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            outcomes[0],
            Err(TallyError::Validation { field: "stars", .. })
        ));
        let saved = outcomes[1].as_ref().unwrap();
        assert_eq!(saved.stars, 3);

        // Only the valid entry reached the store
        assert!(db.get_item_votes(&item_a.id).await.unwrap().is_empty());
        assert_eq!(db.get_item_votes(&item_b.id).await.unwrap().len(), 1);
    }
}
