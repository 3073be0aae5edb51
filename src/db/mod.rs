use crate::error::{Result, TallyError};
use crate::models::{Category, Event, EventStatus, Item, Vote};
use chrono::{DateTime, Utc};
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqlitePool, SqlitePoolOptions},
    Row, Sqlite,
};
use std::collections::HashMap;
use std::env;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new() -> Result<Self> {
        // Get database URL from environment or use a default
        let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:star_tally.db".to_string());
        Self::connect(&db_url).await
    }

    pub async fn connect(db_url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    // Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // Initialize the database schema
    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                admin_id TEXT NOT NULL,
                starts_at TEXT NOT NULL,
                ends_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'draft',
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                category_id TEXT NOT NULL,
                name TEXT NOT NULL,
                thumbnail_url TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        // One vote per (user, item); re-votes overwrite in place
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                stars INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                PRIMARY KEY (user_id, item_id),
                FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    // Create a new event in the database
    pub async fn create_event(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, title, description, admin_id, starts_at, ends_at, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.admin_id)
        .bind(event.starts_at.to_rfc3339())
        .bind(event.ends_at.to_rfc3339())
        .bind(event.status.as_str())
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn add_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, event_id, name, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&category.id)
        .bind(&category.event_id)
        .bind(&category.name)
        .bind(category.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn add_item(&self, item: &Item) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (id, category_id, name, thumbnail_url, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.category_id)
        .bind(&item.name)
        .bind(&item.thumbnail_url)
        .bind(item.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // Get an event by ID
    pub async fn get_event(&self, event_id: &str) -> Result<Event> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, admin_id, starts_at, ends_at, status, created_at
            FROM events
            WHERE id = ?
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| TallyError::not_found("event", event_id))?;

        event_from_row(&row)
    }

    // Get an event together with its categories and their items
    pub async fn get_event_with_categories(
        &self,
        event_id: &str,
    ) -> Result<(Event, Vec<(Category, Vec<Item>)>)> {
        let event = self.get_event(event_id).await?;
        let categories = self.get_event_categories(event_id).await?;

        let mut out = Vec::with_capacity(categories.len());
        for category in categories {
            let items = self.get_category_items(&category.id).await?;
            out.push((category, items));
        }

        Ok((event, out))
    }

    pub async fn get_event_categories(&self, event_id: &str) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, name, created_at
            FROM categories
            WHERE event_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(category_from_row).collect()
    }

    pub async fn get_category_items(&self, category_id: &str) -> Result<Vec<Item>> {
        let rows = sqlx::query(
            r#"
            SELECT id, category_id, name, thumbnail_url, created_at
            FROM items
            WHERE category_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(item_from_row).collect()
    }

    // Get events administered by a given user, newest first
    pub async fn get_admin_events(&self, admin_id: &str) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, admin_id, starts_at, ends_at, status, created_at
            FROM events
            WHERE admin_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(admin_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    // Update an event's title, description and voting window
    pub async fn update_event(&self, event: &Event) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET title = ?, description = ?, starts_at = ?, ends_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.starts_at.to_rfc3339())
        .bind(event.ends_at.to_rfc3339())
        .bind(&event.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TallyError::not_found("event", &event.id));
        }
        Ok(())
    }

    pub async fn set_event_status(&self, event_id: &str, status: EventStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET status = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TallyError::not_found("event", event_id));
        }
        Ok(())
    }

    // Delete an event and everything hanging off it. SQLite only honors the
    // declared FK cascades with a per-connection pragma, so dependents are
    // removed explicitly, leaves first.
    pub async fn delete_event(&self, event_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM votes WHERE item_id IN (
                SELECT i.id FROM items i
                JOIN categories c ON i.category_id = c.id
                WHERE c.event_id = ?
            )
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM items WHERE category_id IN (
                SELECT id FROM categories WHERE event_id = ?
            )
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        sqlx::query("DELETE FROM categories WHERE event_id = ?")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete_category(&self, category_id: &str) -> Result<()> {
        sqlx::query(
            "DELETE FROM votes WHERE item_id IN (SELECT id FROM items WHERE category_id = ?)",
        )
        .bind(category_id)
        .execute(&self.pool)
        .await?;

        sqlx::query("DELETE FROM items WHERE category_id = ?")
            .bind(category_id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(category_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete_item(&self, item_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM votes WHERE item_id = ?")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(item_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // Get open events whose voting window has elapsed
    pub async fn get_expired_open_events(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, admin_id, starts_at, ends_at, status, created_at
            FROM events
            WHERE status = 'open' AND ends_at < ?
            "#,
        )
        .bind(now.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    // Save a vote, replacing any existing vote by the same user for the same
    // item. The original row id survives an overwrite.
    pub async fn upsert_vote(&self, vote: &Vote) -> Result<Vote> {
        let item_exists = sqlx::query("SELECT 1 FROM items WHERE id = ?")
            .bind(&vote.item_id)
            .fetch_optional(&self.pool)
            .await?
            .is_some();

        if !item_exists {
            return Err(TallyError::not_found("item", &vote.item_id));
        }

        sqlx::query(
            r#"
            INSERT INTO votes (id, user_id, item_id, stars, timestamp)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, item_id)
            DO UPDATE SET stars = excluded.stars, timestamp = excluded.timestamp
            "#,
        )
        .bind(&vote.id)
        .bind(&vote.user_id)
        .bind(&vote.item_id)
        .bind(vote.stars)
        .bind(vote.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            r#"
            SELECT id, user_id, item_id, stars, timestamp
            FROM votes
            WHERE user_id = ? AND item_id = ?
            "#,
        )
        .bind(&vote.user_id)
        .bind(&vote.item_id)
        .fetch_one(&self.pool)
        .await?;

        vote_from_row(&row)
    }

    // Get votes for a single item
    pub async fn get_item_votes(&self, item_id: &str) -> Result<Vec<Vote>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, item_id, stars, timestamp
            FROM votes
            WHERE item_id = ?
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(vote_from_row).collect()
    }

    // Get every vote cast in an event in one query; callers group in memory
    pub async fn get_votes_for_event(&self, event_id: &str) -> Result<Vec<Vote>> {
        let rows = sqlx::query(
            r#"
            SELECT v.id, v.user_id, v.item_id, v.stars, v.timestamp
            FROM votes v
            JOIN items i ON v.item_id = i.id
            JOIN categories c ON i.category_id = c.id
            WHERE c.event_id = ?
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(vote_from_row).collect()
    }

    // Get one user's votes within an event, for pre-filling their ballot
    pub async fn get_user_votes_for_event(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> Result<Vec<Vote>> {
        let rows = sqlx::query(
            r#"
            SELECT v.id, v.user_id, v.item_id, v.stars, v.timestamp
            FROM votes v
            JOIN items i ON v.item_id = i.id
            JOIN categories c ON i.category_id = c.id
            WHERE v.user_id = ? AND c.event_id = ?
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(vote_from_row).collect()
    }

    // Per-item ballot counts for an event, without exposing scores
    pub async fn get_vote_counts_for_event(&self, event_id: &str) -> Result<HashMap<String, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT v.item_id, COUNT(*) AS ballots
            FROM votes v
            JOIN items i ON v.item_id = i.id
            JOIN categories c ON i.category_id = c.id
            WHERE c.event_id = ?
            GROUP BY v.item_id
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get::<String, _>("item_id"), row.get::<i64, _>("ballots")))
            .collect())
    }
}

#[cfg(test)]
impl Database {
    // In-memory database for tests. A single connection, since every new
    // `sqlite::memory:` connection would get its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }
}

fn event_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Event> {
    let status_str = row.get::<String, _>("status");
    let status = EventStatus::parse(&status_str).ok_or_else(|| {
        TallyError::DataAccess(sqlx::Error::Decode(
            format!("unknown event status: {status_str}").into(),
        ))
    })?;

    Ok(Event {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        admin_id: row.get("admin_id"),
        starts_at: parse_timestamp(&row.get::<String, _>("starts_at"))?,
        ends_at: parse_timestamp(&row.get::<String, _>("ends_at"))?,
        status,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

fn category_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.get("id"),
        event_id: row.get("event_id"),
        name: row.get("name"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

fn item_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Item> {
    Ok(Item {
        id: row.get("id"),
        category_id: row.get("category_id"),
        name: row.get("name"),
        thumbnail_url: row.get("thumbnail_url"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

fn vote_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Vote> {
    Ok(Vote {
        id: row.get("id"),
        user_id: row.get("user_id"),
        item_id: row.get("item_id"),
        stars: row.get("stars"),
        timestamp: parse_timestamp(&row.get::<String, _>("timestamp"))?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TallyError::DataAccess(sqlx::Error::Decode(e.into())))
}
