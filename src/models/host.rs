use serde::Serialize;
use sqlx::FromRow;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Host {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: NaiveDateTime,
}
