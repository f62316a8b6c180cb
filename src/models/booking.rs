use serde::Serialize;
use sqlx::FromRow;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub id: i64,
    pub event_id: i64,
    pub host_id: Option<i64>,
    pub sno: String,
    // Снимок данных события на момент бронирования
    pub event_title: String,
    pub event_date: Option<NaiveDateTime>,
    pub event_location: String,
    pub user_name: String,
    pub email: String,
    pub phone: String,
    pub member_count: i32,
    pub selected_package: serde_json::Value,
    pub food_preference: String,
    pub additional_members: serde_json::Value,
    pub special_requirements: String,
    pub is_activated: bool,
    pub payment_method: String,
    pub payment_status: String,
    pub payment_amount: f64,
    pub payment_currency: String,
    pub source: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    // Строковый статус для обратной совместимости с фронтендом
    pub fn status(&self) -> &'static str {
        if self.is_activated {
            "Activated"
        } else {
            "Not Scanned"
        }
    }
}
