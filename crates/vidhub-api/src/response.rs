use axum::{Json, http::StatusCode};
use serde::Serialize;

use vidhub_types::api::ApiResponse;

pub type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

pub fn reply<T: Serialize>(status: StatusCode, data: T, message: &str) -> Reply<T> {
    (status, Json(ApiResponse::new(status.as_u16(), data, message)))
}

pub fn ok<T: Serialize>(data: T, message: &str) -> Reply<T> {
    reply(StatusCode::OK, data, message)
}

pub fn created<T: Serialize>(data: T, message: &str) -> Reply<T> {
    reply(StatusCode::CREATED, data, message)
}

/// `data` for responses that carry nothing.
pub fn empty() -> serde_json::Value {
    serde_json::json!({})
}
