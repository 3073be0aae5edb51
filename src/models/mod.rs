use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub admin_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Draft,
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub event_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub user_id: String,
    pub item_id: String,
    pub stars: i32,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(
        title: String,
        description: Option<String>,
        admin_id: String,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            admin_id,
            starts_at,
            ends_at,
            status: EventStatus::Draft,
            created_at: Utc::now(),
        }
    }
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Open => "open",
            EventStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(EventStatus::Draft),
            "open" => Some(EventStatus::Open),
            "closed" => Some(EventStatus::Closed),
            _ => None,
        }
    }
}

impl Category {
    pub fn new(event_id: String, name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id,
            name,
            created_at: Utc::now(),
        }
    }
}

impl Item {
    pub fn new(category_id: String, name: String, thumbnail_url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            category_id,
            name,
            thumbnail_url,
            created_at: Utc::now(),
        }
    }
}

impl Vote {
    pub fn new(user_id: String, item_id: String, stars: i32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            item_id,
            stars,
            timestamp: Utc::now(),
        }
    }
}
