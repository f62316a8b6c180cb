use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::{to_api_error, ApiResult};
use crate::models::Event;
use crate::services::slug::allocate_slug;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/upcoming-ongoing", get(upcoming_ongoing_events))
        .route("/events/slug/{slug}", get(event_by_slug))
        .route("/events/host/{host_id}", get(events_by_host))
        .route("/events/host/{host_id}/stats", get(events_stats_by_host))
        .route("/events/host/{host_id}/yearly", get(events_yearly_by_host))
        .route(
            "/events/{event_id}",
            get(get_event).put(update_event).delete(delete_event),
        )
}

/* ---------- helpers ---------- */

async fn host_exists(pool: &sqlx::PgPool, host_id: i64) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM hosts WHERE id = $1)")
        .bind(host_id)
        .fetch_one(pool)
        .await
}

fn default_tags() -> serde_json::Value {
    json!([])
}

/* ---------- EVENTS ---------- */

// POST /api/events
#[derive(Debug, Deserialize)]
struct CreateEventRequest {
    title: String,
    #[serde(default)]
    description: String,
    date: NaiveDateTime,
    end_date: Option<NaiveDateTime>,
    #[serde(default)]
    location: String,
    #[serde(rename = "type", default)]
    event_type: String,
    #[serde(default)]
    status: String,
    host_id: i64,
    #[serde(default)]
    is_published: bool,
    #[serde(default)]
    category: String,
    #[serde(default = "default_tags")]
    tags: serde_json::Value,
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEventRequest>,
) -> ApiResult<impl IntoResponse> {
    let known_host = host_exists(&state.db.pool, req.host_id).await.map_err(|e| {
        tracing::error!("create_event host lookup error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка базы данных")
    })?;
    if !known_host {
        return Err(to_api_error(StatusCode::NOT_FOUND, "Организатор не найден"));
    }

    let mut tx = state.db.pool.begin().await.map_err(|e| {
        tracing::error!("create_event tx error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка транзакции")
    })?;

    // Слаг выделяется в той же транзакции, что и вставка события
    let slug = allocate_slug(&mut tx, &req.title).await.map_err(|e| {
        tracing::error!("create_event slug allocation error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось выделить слаг")
    })?;

    let event = sqlx::query_as::<_, Event>(
        r#"
        INSERT INTO events (title, description, date, end_date, location, event_type,
                            status, slug, host_id, is_published, category, tags)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.date)
    .bind(req.end_date)
    .bind(&req.location)
    .bind(&req.event_type)
    .bind(&req.status)
    .bind(&slug)
    .bind(req.host_id)
    .bind(req.is_published)
    .bind(&req.category)
    .bind(&req.tags)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("create_event insert error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось создать событие")
    })?;

    tx.commit().await.map_err(|e| {
        tracing::error!("create_event commit error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка фиксации транзакции")
    })?;

    Ok((StatusCode::CREATED, Json(event)))
}

// GET /api/events
#[derive(Debug, Deserialize)]
struct EventsQuery {
    // all | today | last_7_days | last_30_days | custom
    filter: Option<String>,
    host_id: Option<i64>,
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> ApiResult<impl IntoResponse> {
    let today = Utc::now().date_naive();

    // Окно дат по типу фильтра
    let (from_date, to_date): (Option<NaiveDate>, Option<NaiveDate>) =
        match params.filter.as_deref().unwrap_or("all") {
            "today" => (Some(today), Some(today)),
            "last_7_days" => (Some(today - Duration::days(7)), None),
            "last_30_days" => (Some(today - Duration::days(30)), None),
            "custom" => {
                let from = match &params.start_date {
                    Some(s) => Some(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
                        to_api_error(
                            StatusCode::BAD_REQUEST,
                            "Неверный формат start_date. Ожидается YYYY-MM-DD",
                        )
                    })?),
                    None => None,
                };
                let to = match &params.end_date {
                    Some(s) => Some(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
                        to_api_error(
                            StatusCode::BAD_REQUEST,
                            "Неверный формат end_date. Ожидается YYYY-MM-DD",
                        )
                    })?),
                    None => None,
                };
                (from, to)
            }
            _ => (None, None),
        };

    let mut q = String::from("SELECT * FROM events WHERE 1=1");
    let mut bind_idx = 1;
    if params.host_id.is_some() {
        q.push_str(&format!(" AND host_id = ${}", bind_idx));
        bind_idx += 1;
    }
    if from_date.is_some() {
        q.push_str(&format!(" AND date::date >= ${}", bind_idx));
        bind_idx += 1;
    }
    if to_date.is_some() {
        q.push_str(&format!(" AND date::date <= ${}", bind_idx));
    }
    q.push_str(" ORDER BY date");

    let mut dbq = sqlx::query_as::<_, Event>(&q);
    if let Some(h) = params.host_id {
        dbq = dbq.bind(h);
    }
    if let Some(d) = from_date {
        dbq = dbq.bind(d);
    }
    if let Some(d) = to_date {
        dbq = dbq.bind(d);
    }

    let events = dbq.fetch_all(&state.db.pool).await.map_err(|e| {
        tracing::error!("list_events sql error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить список событий")
    })?;

    Ok((StatusCode::OK, Json(events)))
}

// GET /api/events/upcoming-ongoing
async fn upcoming_ongoing_events(
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let events = sqlx::query_as::<_, Event>(
        "SELECT * FROM events WHERE status IN ('Upcoming', 'Ongoing') ORDER BY date",
    )
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("upcoming_ongoing_events sql error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить список событий")
    })?;

    Ok((StatusCode::OK, Json(events)))
}

// GET /api/events/slug/{slug}
async fn event_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE slug = $1")
        .bind(&slug)
        .fetch_optional(&state.db.pool)
        .await
        .map_err(|e| {
            tracing::error!("event_by_slug sql error: {:?}", e);
            to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка базы данных")
        })?
        .ok_or_else(|| to_api_error(StatusCode::NOT_FOUND, "Событие не найдено"))?;

    // Наружу отдаем только опубликованные события
    if !event.is_published {
        return Err(to_api_error(StatusCode::NOT_FOUND, "Событие не опубликовано"));
    }

    Ok((StatusCode::OK, Json(event)))
}

// GET /api/events/{event_id}
async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&state.db.pool)
        .await
        .map_err(|e| {
            tracing::error!("get_event sql error: {:?}", e);
            to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка базы данных")
        })?
        .ok_or_else(|| to_api_error(StatusCode::NOT_FOUND, "Событие не найдено"))?;

    Ok((StatusCode::OK, Json(event)))
}

// PUT /api/events/{event_id}
// Слаг при обновлении не пересчитывается
#[derive(Debug, Deserialize)]
struct UpdateEventRequest {
    title: Option<String>,
    description: Option<String>,
    date: Option<NaiveDateTime>,
    end_date: Option<NaiveDateTime>,
    location: Option<String>,
    #[serde(rename = "type")]
    event_type: Option<String>,
    status: Option<String>,
    is_published: Option<bool>,
    category: Option<String>,
    tags: Option<serde_json::Value>,
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
    Json(req): Json<UpdateEventRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut columns: Vec<&str> = Vec::new();
    if req.title.is_some() {
        columns.push("title");
    }
    if req.description.is_some() {
        columns.push("description");
    }
    if req.date.is_some() {
        columns.push("date");
    }
    if req.end_date.is_some() {
        columns.push("end_date");
    }
    if req.location.is_some() {
        columns.push("location");
    }
    if req.event_type.is_some() {
        columns.push("event_type");
    }
    if req.status.is_some() {
        columns.push("status");
    }
    if req.is_published.is_some() {
        columns.push("is_published");
    }
    if req.category.is_some() {
        columns.push("category");
    }
    if req.tags.is_some() {
        columns.push("tags");
    }

    if columns.is_empty() {
        // Нечего обновлять - возвращаем текущее состояние
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&state.db.pool)
            .await
            .map_err(|e| {
                tracing::error!("update_event sql error: {:?}", e);
                to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка базы данных")
            })?
            .ok_or_else(|| to_api_error(StatusCode::NOT_FOUND, "Событие не найдено"))?;
        return Ok((StatusCode::OK, Json(event)));
    }

    let sets: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = ${}", column, i + 1))
        .collect();
    let q = format!(
        "UPDATE events SET {}, updated_at = NOW() WHERE id = ${} RETURNING *",
        sets.join(", "),
        columns.len() + 1
    );

    let mut dbq = sqlx::query_as::<_, Event>(&q);
    if let Some(v) = req.title {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.description {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.date {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.end_date {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.location {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.event_type {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.status {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.is_published {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.category {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.tags {
        dbq = dbq.bind(v);
    }

    let event = dbq
        .bind(event_id)
        .fetch_optional(&state.db.pool)
        .await
        .map_err(|e| {
            tracing::error!("update_event sql error: {:?}", e);
            to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось обновить событие")
        })?
        .ok_or_else(|| to_api_error(StatusCode::NOT_FOUND, "Событие не найдено"))?;

    Ok((StatusCode::OK, Json(event)))
}

// DELETE /api/events/{event_id}
async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let deleted = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(&state.db.pool)
        .await
        .map_err(|e| {
            tracing::error!("delete_event sql error: {:?}", e);
            to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось удалить событие")
        })?
        .rows_affected();

    if deleted == 0 {
        return Err(to_api_error(StatusCode::NOT_FOUND, "Событие не найдено"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/* ---------- HOST VIEWS ---------- */

// GET /api/events/host/{host_id}
async fn events_by_host(
    State(state): State<Arc<AppState>>,
    Path(host_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let events = sqlx::query_as::<_, Event>(
        "SELECT * FROM events WHERE host_id = $1 ORDER BY created_at DESC",
    )
    .bind(host_id)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("events_by_host sql error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить список событий")
    })?;

    Ok((StatusCode::OK, Json(events)))
}

// GET /api/events/host/{host_id}/stats
async fn events_stats_by_host(
    State(state): State<Arc<AppState>>,
    Path(host_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let (total, ongoing, upcoming): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE date <= NOW() AND end_date > NOW()),
               COUNT(*) FILTER (WHERE date > NOW())
        FROM events
        WHERE host_id = $1
        "#,
    )
    .bind(host_id)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("events_stats_by_host sql error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить статистику")
    })?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "total": total,
            "ongoing": ongoing,
            "upcoming": upcoming,
        })),
    ))
}

// GET /api/events/host/{host_id}/yearly
async fn events_yearly_by_host(
    State(state): State<Arc<AppState>>,
    Path(host_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let rows: Vec<(i32, i64)> = sqlx::query_as(
        r#"
        SELECT EXTRACT(YEAR FROM date)::INT AS year, COUNT(*)
        FROM events
        WHERE host_id = $1
        GROUP BY 1
        ORDER BY 1
        "#,
    )
    .bind(host_id)
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("events_yearly_by_host sql error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить статистику")
    })?;

    let payload: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|(year, count)| json!({ "year": year, "count": count }))
        .collect();

    Ok((StatusCode::OK, Json(payload)))
}
