//! Handlers for the `/users` resource.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use userhub_core::types::DbId;
use userhub_db::models::user::{CreateUser, UpdateUser, User};

use crate::error::AppResult;
use crate::response::{data, DataResponse};
use crate::state::AppState;

/// POST /users
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateUser>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<User>>)> {
    let Json(input) = payload?;
    let user = state.users.create(&input).await?;
    Ok((StatusCode::CREATED, data(user)))
}

/// GET /users
pub async fn list(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<User>>>> {
    Ok(data(state.users.list().await?))
}

/// GET /users/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<User>>> {
    Ok(data(state.users.get(id).await?))
}

/// PUT /users/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    payload: Result<Json<UpdateUser>, JsonRejection>,
) -> AppResult<Json<DataResponse<User>>> {
    let Json(input) = payload?;
    Ok(data(state.users.update(id, &input).await?))
}

/// DELETE /users/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
