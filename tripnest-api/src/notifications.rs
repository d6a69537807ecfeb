use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::Deserialize;
use uuid::Uuid;

use tripnest_store::notification_repo::Notification;
use tripnest_store::NotificationRepository;

use crate::auth::authenticate;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct UpdateNotificationRequest {
    read: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/notifications", get(list_notifications))
        .route("/v1/notifications/{id}", patch(update_notification))
}

async fn list_notifications(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let claims = authenticate(&bearer, &state.auth.secret)?;
    let user_id = claims.user_id()?;

    let notifications = NotificationRepository::list_for_user(&state.db.pool, user_id).await?;
    Ok(Json(notifications))
}

async fn update_notification(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNotificationRequest>,
) -> Result<Json<Notification>, AppError> {
    let claims = authenticate(&bearer, &state.auth.secret)?;
    let user_id = claims.user_id()?;

    let notification = NotificationRepository::set_read(&state.db.pool, id, user_id, req.read)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Notification not found".to_string()))?;

    Ok(Json(notification))
}
