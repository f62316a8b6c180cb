use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{to_api_error, ApiResult};
use crate::models::Booking;
use crate::services::serial::allocate_sno;
use crate::services::AllocError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events/{event_id}/register", post(register_for_event))
        .route("/events/{event_id}/bookings", get(bookings_by_event))
        .route("/bookings/sno/{sno}", get(get_booking_by_sno))
        .route("/bookings/sno/{sno}/scan", post(scan_booking_by_sno))
        .route("/bookings/host/{host_id}", get(bookings_by_host))
}

/* ---------- helpers ---------- */

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: i64,
    title: String,
    date: NaiveDateTime,
    location: String,
    host_id: i64,
}

async fn event_by_id(pool: &sqlx::PgPool, event_id: i64) -> sqlx::Result<Option<EventRow>> {
    sqlx::query_as::<_, EventRow>(
        "SELECT id, title, date, location, host_id FROM events WHERE id = $1",
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await
}

// Сериализация бронирования со строковым статусом (совместимость с фронтендом)
fn booking_json(booking: &Booking) -> serde_json::Value {
    let mut value = json!(booking);
    value["status"] = json!(booking.status());
    value
}

fn default_member_count() -> i32 {
    1
}

fn default_payment_method() -> String {
    "paynow".to_string()
}

fn default_payment_status() -> String {
    "pending".to_string()
}

fn default_currency() -> String {
    "SGD".to_string()
}

fn default_source() -> String {
    "web".to_string()
}

fn empty_object() -> serde_json::Value {
    json!({})
}

fn empty_array() -> serde_json::Value {
    json!([])
}

/* ---------- BOOKINGS ---------- */

// POST /api/events/{event_id}/register
#[derive(Debug, Deserialize)]
struct RegisterRequest {
    user_name: String,
    email: String,
    #[serde(default)]
    phone: String,
    #[serde(default = "default_member_count")]
    member_count: i32,
    #[serde(default = "empty_object")]
    selected_package: serde_json::Value,
    #[serde(default)]
    food_preference: String,
    #[serde(default = "empty_array")]
    additional_members: serde_json::Value,
    #[serde(default)]
    special_requirements: String,
    #[serde(default = "default_payment_method")]
    payment_method: String,
    #[serde(default = "default_payment_status")]
    payment_status: String,
    #[serde(default)]
    total_amount: f64,
    #[serde(default = "default_currency")]
    payment_currency: String,
    #[serde(default = "default_source")]
    source: String,
    host_id: Option<i64>,
}

async fn register_for_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.user_name.trim().is_empty() {
        return Err(to_api_error(StatusCode::BAD_REQUEST, "Имя участника обязательно"));
    }
    if !req.email.contains('@') {
        return Err(to_api_error(StatusCode::BAD_REQUEST, "Некорректный email"));
    }
    if req.member_count < 1 {
        return Err(to_api_error(StatusCode::BAD_REQUEST, "member_count должен быть >= 1"));
    }

    let event = event_by_id(&state.db.pool, event_id)
        .await
        .map_err(|e| {
            tracing::error!("register_for_event event lookup error: {:?}", e);
            to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка базы данных")
        })?
        .ok_or_else(|| to_api_error(StatusCode::NOT_FOUND, "Событие не найдено"))?;

    // Организатор из запроса, если он существует, иначе организатор события
    let host_id = match req.host_id {
        Some(candidate) if candidate != event.host_id => {
            let known = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM hosts WHERE id = $1)",
            )
            .bind(candidate)
            .fetch_one(&state.db.pool)
            .await
            .unwrap_or(false);
            if known {
                candidate
            } else {
                event.host_id
            }
        }
        _ => event.host_id,
    };

    let mut tx = state.db.pool.begin().await.map_err(|e| {
        tracing::error!("register_for_event tx error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка транзакции")
    })?;

    // SNO выделяется в той же транзакции, что и вставка бронирования
    let sno = allocate_sno(&mut tx, event.id, &event.title)
        .await
        .map_err(|e| match e {
            AllocError::RetriesExhausted { .. } => {
                tracing::error!("register_for_event: sno probes exhausted for event {}", event.id);
                to_api_error(StatusCode::CONFLICT, "Не удалось выделить серийный номер")
            }
            AllocError::Database(e) => {
                tracing::error!("register_for_event sno allocation error: {:?}", e);
                to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка базы данных")
            }
        })?;

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (event_id, host_id, sno, event_title, event_date, event_location,
                              user_name, email, phone, member_count, selected_package,
                              food_preference, additional_members, special_requirements,
                              payment_method, payment_status, payment_amount, payment_currency,
                              source)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
        RETURNING *
        "#,
    )
    .bind(event.id)
    .bind(host_id)
    .bind(&sno)
    .bind(&event.title)
    .bind(event.date)
    .bind(&event.location)
    .bind(&req.user_name)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(req.member_count)
    .bind(&req.selected_package)
    .bind(&req.food_preference)
    .bind(&req.additional_members)
    .bind(&req.special_requirements)
    .bind(&req.payment_method)
    .bind(&req.payment_status)
    .bind(req.total_amount)
    .bind(&req.payment_currency)
    .bind(&req.source)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("register_for_event insert error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось создать бронирование")
    })?;

    tx.commit().await.map_err(|e| {
        tracing::error!("register_for_event commit error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка фиксации транзакции")
    })?;

    tracing::info!("booking {} created for event {}", booking.sno, event.id);

    // Ссылка активации: ее потребляют генерация QR-кода и письма
    let activation_url = format!("{}/activate/{}", state.config.frontend.base_url, booking.sno);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "booking": booking_json(&booking),
            "activation_url": activation_url,
        })),
    ))
}

// GET /api/events/{event_id}/bookings
async fn bookings_by_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let bookings = sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE event_id = $1 ORDER BY created_at DESC",
    )
    .bind(event_id)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("bookings_by_event sql error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить список бронирований")
    })?;

    let payload: Vec<serde_json::Value> = bookings.iter().map(booking_json).collect();
    Ok((StatusCode::OK, Json(payload)))
}

// GET /api/bookings/sno/{sno}
async fn get_booking_by_sno(
    State(state): State<Arc<AppState>>,
    Path(sno): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE sno = $1")
        .bind(&sno)
        .fetch_optional(&state.db.pool)
        .await
        .map_err(|e| {
            tracing::error!("get_booking_by_sno sql error: {:?}", e);
            to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка базы данных")
        })?
        .ok_or_else(|| to_api_error(StatusCode::NOT_FOUND, "Бронирование не найдено"))?;

    Ok((StatusCode::OK, Json(booking_json(&booking))))
}

// POST /api/bookings/sno/{sno}/scan
// Сканирование QR на входе переключает статус активации
async fn scan_booking_by_sno(
    State(state): State<Arc<AppState>>,
    Path(sno): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let booking = sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings
        SET is_activated = NOT is_activated, updated_at = NOW()
        WHERE sno = $1
        RETURNING *
        "#,
    )
    .bind(&sno)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("scan_booking_by_sno sql error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка базы данных")
    })?
    .ok_or_else(|| to_api_error(StatusCode::NOT_FOUND, "Бронирование не найдено"))?;

    let action = if booking.is_activated { "activated" } else { "deactivated" };

    Ok((
        StatusCode::OK,
        Json(json!({
            "booking": booking_json(&booking),
            "is_activated": booking.is_activated,
            "status": booking.status(),
            "message": format!("Booking {} {} successfully", booking.sno, action),
        })),
    ))
}

// GET /api/bookings/host/{host_id}
// Бронирования по всем событиям организатора
async fn bookings_by_host(
    State(state): State<Arc<AppState>>,
    Path(host_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let bookings = sqlx::query_as::<_, Booking>(
        r#"
        SELECT b.*
        FROM bookings b
        JOIN events e ON e.id = b.event_id
        WHERE e.host_id = $1
        ORDER BY b.created_at DESC
        "#,
    )
    .bind(host_id)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("bookings_by_host sql error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить список бронирований")
    })?;

    let payload: Vec<serde_json::Value> = bookings.iter().map(booking_json).collect();
    Ok((StatusCode::OK, Json(payload)))
}
