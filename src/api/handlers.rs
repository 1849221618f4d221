use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::models::User;

use super::dto::{DeleteResponse, HealthResponse, ListQuery, ReadyResponse, UserPayload};
use super::error::AppError;
use super::routes::AppState;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string() })
}

pub async fn ready_check(
    State(state): State<AppState>,
) -> Result<Json<ReadyResponse>, AppError> {
    state.repository.health_check().await?;
    Ok(Json(ReadyResponse {
        status: "ready".to_string(),
        database: "connected".to_string(),
    }))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let (start, count) = query.bounds();
    let users = state.repository.list_users(start, count).await?;
    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let Json(payload) = payload
        .map_err(|_| AppError::BadRequest("Invalid request payload".to_string()))?;

    let user = state.repository.create_user(&payload.name, payload.age).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let id = parse_user_id(&id)?;

    let user = state.repository.fetch_user(id).await.map_err(|e| {
        if e.is_not_found() {
            AppError::NotFound("User not found".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let id = parse_user_id(&id)?;
    let Json(payload) = payload
        .map_err(|_| AppError::BadRequest("Invalid request payload".to_string()))?;

    let user = state.repository.update_user(id, &payload.name, payload.age).await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = parse_user_id(&id)?;
    state.repository.delete_user(id).await?;
    Ok(Json(DeleteResponse::success()))
}

fn parse_user_id(raw: &str) -> Result<i32, AppError> {
    raw.parse::<i32>()
        .map_err(|_| AppError::BadRequest("Invalid user ID".to_string()))
}
