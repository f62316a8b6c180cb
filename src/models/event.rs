use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: NaiveDateTime,
    pub end_date: Option<NaiveDateTime>,
    pub location: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub status: String,
    pub slug: String,
    pub host_id: i64,
    pub is_published: bool,
    pub category: String,
    pub tags: serde_json::Value,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
