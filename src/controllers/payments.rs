use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{to_api_error, ApiResult};
use crate::models::Payment;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/payments", get(list_payments).post(create_payment))
}

const PAYMENT_STATUSES: [&str; 5] = ["pending", "completed", "failed", "cancelled", "expired"];

// POST /api/payments
#[derive(Debug, Deserialize)]
struct CreatePaymentRequest {
    reference_number: String,
    host_id: Option<i64>,
    booking_id: Option<i64>,
    amount: f64,
    #[serde(default = "default_currency")]
    currency: String,
    status: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    purpose: String,
}

fn default_currency() -> String {
    "SGD".to_string()
}

async fn create_payment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.reference_number.trim().is_empty() {
        return Err(to_api_error(StatusCode::BAD_REQUEST, "reference_number обязателен"));
    }
    if !PAYMENT_STATUSES.contains(&req.status.as_str()) {
        return Err(to_api_error(
            StatusCode::BAD_REQUEST,
            "status должен быть pending | completed | failed | cancelled | expired",
        ));
    }

    let mut tx = state.db.pool.begin().await.map_err(|e| {
        tracing::error!("create_payment tx error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка транзакции")
    })?;

    let payment = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (reference_number, host_id, booking_id, amount, currency,
                              status, email, name, purpose)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(&req.reference_number)
    .bind(req.host_id)
    .bind(req.booking_id)
    .bind(req.amount)
    .bind(&req.currency)
    .bind(&req.status)
    .bind(&req.email)
    .bind(&req.name)
    .bind(&req.purpose)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            return to_api_error(
                StatusCode::CONFLICT,
                "Платеж с таким reference_number уже существует",
            );
        }
        tracing::error!("create_payment insert error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось сохранить платеж")
    })?;

    // Сверяем статус оплаты связанного бронирования
    if let Some(booking_id) = req.booking_id {
        sqlx::query("UPDATE bookings SET payment_status = $1, updated_at = NOW() WHERE id = $2")
            .bind(&req.status)
            .bind(booking_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("create_payment booking update error: {:?}", e);
                to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось обновить бронирование")
            })?;
    }

    tx.commit().await.map_err(|e| {
        tracing::error!("create_payment commit error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка фиксации транзакции")
    })?;

    Ok((StatusCode::CREATED, Json(payment)))
}

// GET /api/payments
#[derive(Debug, Deserialize)]
struct PaymentsQuery {
    host_id: Option<i64>,
    page: Option<u32>,
    per_page: Option<u32>,
}

async fn list_payments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaymentsQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);
    let offset = ((page - 1) * per_page) as i64;
    let limit = per_page as i64;

    let payment_count: i64 = match params.host_id {
        Some(host_id) => sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE host_id = $1")
            .bind(host_id)
            .fetch_one(&state.db.pool)
            .await,
        None => sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(&state.db.pool)
            .await,
    }
    .map_err(|e| {
        tracing::error!("list_payments count error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка базы данных")
    })?;

    // Если записей о платежах нет - собираем их из бронирований
    let (total, data) = if payment_count == 0 {
        booking_fallback(&state, params.host_id, limit, offset).await?
    } else {
        let mut q = String::from("SELECT * FROM payments WHERE 1=1");
        let mut bind_idx = 1;
        if params.host_id.is_some() {
            q.push_str(&format!(" AND host_id = ${}", bind_idx));
            bind_idx += 1;
        }
        q.push_str(&format!(
            " ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            bind_idx,
            bind_idx + 1
        ));

        let mut dbq = sqlx::query_as::<_, Payment>(&q);
        if let Some(h) = params.host_id {
            dbq = dbq.bind(h);
        }
        let payments = dbq
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.db.pool)
            .await
            .map_err(|e| {
                tracing::error!("list_payments sql error: {:?}", e);
                to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить список платежей")
            })?;

        let data: Vec<serde_json::Value> = payments
            .into_iter()
            .map(|p| {
                json!({
                    "id": p.id.to_string(),
                    "reference_number": p.reference_number,
                    "amount": p.amount,
                    "currency": p.currency,
                    "status": p.status,
                    "email": p.email,
                    "name": p.name,
                    "purpose": p.purpose,
                    "host_id": p.host_id.map(|h| h.to_string()),
                    "created_at": p.created_at,
                    "updated_at": p.updated_at,
                })
            })
            .collect();

        (payment_count, data)
    };

    let from = if total > 0 { offset + 1 } else { 0 };
    let to = (offset + data.len() as i64).min(total);

    Ok((
        StatusCode::OK,
        Json(json!({
            "payment_requests": data,
            "total": total,
            "page": page,
            "per_page": per_page,
            "from": from,
            "to": to,
        })),
    ))
}

// Платежная история из бронирований: reference_number берется из SNO
async fn booking_fallback(
    state: &Arc<AppState>,
    host_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> Result<(i64, Vec<serde_json::Value>), (StatusCode, Json<super::ApiError>)> {
    let total: i64 = match host_id {
        Some(h) => sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE host_id = $1")
            .bind(h)
            .fetch_one(&state.db.pool)
            .await,
        None => sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
            .fetch_one(&state.db.pool)
            .await,
    }
    .map_err(|e| {
        tracing::error!("booking_fallback count error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка базы данных")
    })?;

    let mut q = String::from(
        "SELECT b.id, b.sno, b.payment_amount, b.payment_currency, b.payment_status, \
         b.email, b.user_name, b.event_title, b.host_id, h.name AS host_name, \
         b.payment_method, b.created_at, b.updated_at \
         FROM bookings b LEFT JOIN hosts h ON h.id = b.host_id WHERE 1=1",
    );
    let mut bind_idx = 1;
    if host_id.is_some() {
        q.push_str(&format!(" AND b.host_id = ${}", bind_idx));
        bind_idx += 1;
    }
    q.push_str(&format!(
        " ORDER BY b.created_at DESC LIMIT ${} OFFSET ${}",
        bind_idx,
        bind_idx + 1
    ));

    #[derive(sqlx::FromRow)]
    struct FallbackRow {
        id: i64,
        sno: String,
        payment_amount: f64,
        payment_currency: String,
        payment_status: String,
        email: String,
        user_name: String,
        event_title: String,
        host_id: Option<i64>,
        host_name: Option<String>,
        payment_method: String,
        created_at: chrono::NaiveDateTime,
        updated_at: chrono::NaiveDateTime,
    }

    let mut dbq = sqlx::query_as::<_, FallbackRow>(&q);
    if let Some(h) = host_id {
        dbq = dbq.bind(h);
    }
    let rows = dbq
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db.pool)
        .await
        .map_err(|e| {
            tracing::error!("booking_fallback sql error: {:?}", e);
            to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить список платежей")
        })?;

    let data = rows
        .into_iter()
        .map(|r| {
            json!({
                "id": r.id.to_string(),
                "reference_number": r.sno,
                "amount": r.payment_amount,
                "currency": r.payment_currency,
                "status": r.payment_status,
                "email": r.email,
                "name": r.user_name,
                "purpose": format!("Event: {}", r.event_title),
                "host_id": r.host_id.map(|h| h.to_string()),
                "host_name": r.host_name,
                "payment_method": r.payment_method,
                "created_at": r.created_at,
                "updated_at": r.updated_at,
            })
        })
        .collect();

    Ok((total, data))
}
