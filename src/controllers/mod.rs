pub mod hosts;
pub mod events;
pub mod bookings;
pub mod payments;

use axum::{http::StatusCode, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(hosts::routes())
        .merge(events::routes())
        .merge(bookings::routes())
        .merge(payments::routes())
}

// Единый формат ошибок API
#[derive(Serialize)]
pub struct ApiError {
    success: bool,
    message: String,
}

pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

pub fn to_api_error(status: StatusCode, message: &str) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            success: false,
            message: message.to_string(),
        }),
    )
}
