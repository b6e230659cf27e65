//! Response envelope for the user routes.
//!
//! Successful responses carrying a body are wrapped as `{ "data": ... }`;
//! errors use the `{ "error", "code" }` shape from [`crate::error`].

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Wrap `data` in the envelope, ready to return from a handler.
pub fn data<T: Serialize>(data: T) -> Json<DataResponse<T>> {
    Json(DataResponse { data })
}
