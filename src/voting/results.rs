use crate::db::Database;
use crate::error::Result;
use crate::models::{Category, Item, Vote};
use crate::voting::{CategoryResult, ItemResult};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Rank every item in a category from its votes.
///
/// Items with no votes still appear, with zeroed totals. Ranks are dense and
/// 1-based: highest total points first, average score breaking ties, item id
/// deciding anything still level.
pub fn category_results(
    category: &Category,
    items: &[Item],
    votes_by_item: &HashMap<String, Vec<Vote>>,
) -> CategoryResult {
    let mut results: Vec<ItemResult> = items
        .iter()
        .map(|item| {
            let votes = votes_by_item
                .get(&item.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let vote_count = votes.len();
            let total_points: i64 = votes.iter().map(|vote| vote.stars as i64).sum();
            let avg_score = if vote_count > 0 {
                total_points as f64 / vote_count as f64
            } else {
                0.0
            };

            ItemResult {
                item_id: item.id.clone(),
                name: item.name.clone(),
                total_points,
                avg_score,
                vote_count,
                rank: 0,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| b.avg_score.partial_cmp(&a.avg_score).unwrap_or(Ordering::Equal))
            .then_with(|| a.item_id.cmp(&b.item_id))
    });

    for (index, result) in results.iter_mut().enumerate() {
        result.rank = index + 1;
    }

    CategoryResult {
        category_id: category.id.clone(),
        category_name: category.name.clone(),
        items: results,
    }
}

pub fn group_votes_by_item(votes: Vec<Vote>) -> HashMap<String, Vec<Vote>> {
    let mut grouped: HashMap<String, Vec<Vote>> = HashMap::new();
    for vote in votes {
        grouped.entry(vote.item_id.clone()).or_default().push(vote);
    }
    grouped
}

/// Compute standings for every category of an event.
///
/// All votes for the event are fetched in a single batched query and grouped
/// in memory, one aggregation pass per category.
pub async fn event_results(db: &Database, event_id: &str) -> Result<Vec<CategoryResult>> {
    let (_event, categories) = db.get_event_with_categories(event_id).await?;
    let votes_by_item = group_votes_by_item(db.get_votes_for_event(event_id).await?);

    Ok(categories
        .iter()
        .map(|(category, items)| category_results(category, items, &votes_by_item))
        .collect())
}
