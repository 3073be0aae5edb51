pub mod results;
pub mod submit;

use serde::Serialize;

// Derived standings for one item; recomputed on every request, never stored
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub item_id: String,
    pub name: String,
    pub total_points: i64,
    pub avg_score: f64,
    pub vote_count: usize,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryResult {
    pub category_id: String,
    pub category_name: String,
    pub items: Vec<ItemResult>,
}
