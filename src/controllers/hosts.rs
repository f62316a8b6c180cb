use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{to_api_error, ApiResult};
use crate::models::Host;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/hosts", get(list_hosts).post(create_host))
        .route("/hosts/{host_id}", get(get_host))
}

// POST /api/hosts
#[derive(Debug, Deserialize)]
struct CreateHostRequest {
    name: String,
    email: String,
    #[serde(default)]
    phone: String,
}

async fn create_host(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateHostRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.name.trim().is_empty() {
        return Err(to_api_error(StatusCode::BAD_REQUEST, "Имя организатора обязательно"));
    }
    if req.email.trim().is_empty() {
        return Err(to_api_error(StatusCode::BAD_REQUEST, "Email организатора обязателен"));
    }

    let host = sqlx::query_as::<_, Host>(
        "INSERT INTO hosts (name, email, phone) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&req.name)
    .bind(&req.email)
    .bind(&req.phone)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| {
        tracing::error!("create_host sql error: {:?}", e);
        to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось создать организатора")
    })?;

    Ok((StatusCode::CREATED, Json(host)))
}

// GET /api/hosts
async fn list_hosts(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let hosts = sqlx::query_as::<_, Host>("SELECT * FROM hosts ORDER BY created_at DESC")
        .fetch_all(&state.db.pool)
        .await
        .map_err(|e| {
            tracing::error!("list_hosts sql error: {:?}", e);
            to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Не удалось получить список организаторов")
        })?;

    Ok((StatusCode::OK, Json(hosts)))
}

// GET /api/hosts/{host_id}
async fn get_host(
    State(state): State<Arc<AppState>>,
    Path(host_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let host = sqlx::query_as::<_, Host>("SELECT * FROM hosts WHERE id = $1")
        .bind(host_id)
        .fetch_optional(&state.db.pool)
        .await
        .map_err(|e| {
            tracing::error!("get_host sql error: {:?}", e);
            to_api_error(StatusCode::INTERNAL_SERVER_ERROR, "Ошибка базы данных")
        })?
        .ok_or_else(|| to_api_error(StatusCode::NOT_FOUND, "Организатор не найден"))?;

    Ok((StatusCode::OK, Json(host)))
}
