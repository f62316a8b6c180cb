use serde::Serialize;
use sqlx::FromRow;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: i64,
    pub reference_number: String,
    pub host_id: Option<i64>,
    pub booking_id: Option<i64>,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub email: String,
    pub name: String,
    pub purpose: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
