use axum::{
    extract::State,
    routing::patch,
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use tripnest_core::booking::{BookingStatus, NotificationKind, RoomType};
use tripnest_core::reconcile::plan_capacity_reduction;
use tripnest_store::{BookingRepository, HotelRepository, NotificationRepository, RoomRepository};

use crate::auth::authenticate;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCapacityRequest {
    room_type_id: Uuid,
    new_total_rooms: i32,
}

impl UpdateCapacityRequest {
    /// Rejected before any mutation is attempted.
    fn validate(&self) -> Result<(), AppError> {
        if self.new_total_rooms < 0 {
            return Err(AppError::ValidationError(
                "Total rooms cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCapacityResponse {
    updated_room_type: RoomType,
    cancelled_bookings: usize,
    message: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/rooms/capacity", patch(update_capacity))
}

/// Shrink or grow a room type's capacity. A reduction below current
/// demand cancels the newest overlapping reservations until the freed
/// count covers the reduction; status flips, parent cascades,
/// cancellation notifications and the capacity write all commit in one
/// transaction, so a failure partway leaves nothing half-reconciled.
async fn update_capacity(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<UpdateCapacityRequest>,
) -> Result<Json<UpdateCapacityResponse>, AppError> {
    let claims = authenticate(&bearer, &state.auth.secret)?;
    let user_id = claims.user_id()?;

    req.validate()?;

    let mut tx = state.db.pool.begin().await?;

    // The row lock serializes this against concurrent bookings and
    // other capacity updates for the same room type.
    let room_type = RoomRepository::lock_room_type(&mut tx, req.room_type_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Room type not found".to_string()))?;

    let hotel = HotelRepository::find_hotel(&mut *tx, room_type.hotel_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Hotel not found".to_string()))?;

    if hotel.owner_id != user_id {
        return Err(AppError::AuthorizationError(
            "You are not authorized to update this room type".to_string(),
        ));
    }

    let confirmed = RoomRepository::confirmed_windows(&mut tx, room_type.id).await?;
    let plan = plan_capacity_reduction(room_type.total_rooms, req.new_total_rooms, &confirmed);

    for reservation in &plan.to_cancel {
        BookingRepository::set_hotel_booking_status(
            &mut tx,
            reservation.hotel_booking_id,
            BookingStatus::Cancelled,
        )
        .await?;

        let siblings = BookingRepository::sibling_statuses(&mut tx, reservation.booking_id).await?;
        if siblings.iter().all(|s| *s == BookingStatus::Cancelled) {
            BookingRepository::set_booking_status(
                &mut tx,
                reservation.booking_id,
                BookingStatus::Cancelled,
            )
            .await?;
        }

        NotificationRepository::create(
            &mut *tx,
            reservation.user_id,
            NotificationKind::Cancellation,
            &format!(
                "Your booking at {} has been cancelled due to availability changes.",
                hotel.name
            ),
        )
        .await?;
    }

    let updated_room_type =
        RoomRepository::update_total_rooms(&mut tx, room_type.id, req.new_total_rooms).await?;

    tx.commit().await?;

    if !plan.is_noop() {
        info!(
            room_type_id = %updated_room_type.id,
            cancelled = plan.to_cancel.len(),
            rooms_freed = plan.rooms_freed,
            "capacity reduced below demand, reservations cancelled"
        );
    }

    let cancelled = plan.to_cancel.len();
    let message = if cancelled > 0 {
        format!(
            "Room availability updated. {} booking(s) were cancelled.",
            cancelled
        )
    } else {
        "Room availability updated successfully.".to_string()
    };

    Ok(Json(UpdateCapacityResponse {
        updated_room_type,
        cancelled_bookings: cancelled,
        message,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_capacity_is_rejected_before_any_mutation() {
        let body = serde_json::json!({
            "roomTypeId": "6f9619ff-8b86-4d01-b42d-00cf4fc964ff",
            "newTotalRooms": -1
        });
        let req: UpdateCapacityRequest = serde_json::from_value(body).unwrap();
        assert!(matches!(
            req.validate(),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn zero_capacity_is_a_valid_reduction_target() {
        let body = serde_json::json!({
            "roomTypeId": "6f9619ff-8b86-4d01-b42d-00cf4fc964ff",
            "newTotalRooms": 0
        });
        let req: UpdateCapacityRequest = serde_json::from_value(body).unwrap();
        assert!(req.validate().is_ok());
    }
}
