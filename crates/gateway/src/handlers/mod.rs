//! API handlers module

pub mod account;
pub mod cases;
pub mod documents;
pub mod health;
pub mod messages;
pub mod notifications;
pub mod users;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use casebook_common::API_PREFIX;
use serde::Serialize;

/// 201 with a `Location` header pointing at the new resource
pub(crate) fn created<T: Serialize>(collection: &str, id: impl std::fmt::Display, body: T) -> Response {
    let location = format!("{}/{}/{}", API_PREFIX, collection, id);
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(body),
    )
        .into_response()
}
