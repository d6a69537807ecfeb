use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tripnest_core::availability::rooms_available;
use tripnest_core::stay::StayRange;
use tripnest_store::RoomRepository;

use crate::auth::authenticate;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityQuery {
    room_type_id: Uuid,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityResponse {
    room_name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    availability: i32,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/rooms/availability", get(room_availability))
}

/// Owner-facing availability check over a date window (30 days from
/// the start when no end is given).
async fn room_availability(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let claims = authenticate(&bearer, &state.auth.secret)?;
    let user_id = claims.user_id()?;

    let start = query.start_date.unwrap_or_else(|| Utc::now().date_naive());
    let end = match query.end_date {
        Some(end) => end,
        None => start + Days::new(30),
    };
    let range = StayRange::new(start, end)?;

    let (room_type, owner_id) =
        RoomRepository::find_room_type_with_owner(&state.db.pool, query.room_type_id)
            .await?
            .ok_or_else(|| AppError::NotFoundError("Room type not found".to_string()))?;

    if owner_id != user_id {
        return Err(AppError::AuthorizationError(
            "You are not authorized to view availability for this room type".to_string(),
        ));
    }

    let confirmed =
        RoomRepository::confirmed_overlapping(&state.db.pool, room_type.id, &range).await?;
    let availability = rooms_available(room_type.total_rooms, &range, &confirmed);

    Ok(Json(AvailabilityResponse {
        room_name: room_type.name,
        start_date: range.check_in(),
        end_date: range.check_out(),
        availability,
    }))
}
