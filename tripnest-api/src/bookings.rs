use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use tripnest_core::availability::check_request;
use tripnest_core::booking::{Booking, BookingStatus, HotelBooking, NotificationKind};
use tripnest_core::stay::StayRange;
use tripnest_store::{BookingRepository, NotificationRepository, RoomRepository};

use crate::auth::authenticate;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingRequest {
    room_type_id: Uuid,
    #[serde(flatten)]
    stay: StayRange,
    rooms_booked: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingResponse {
    booking: Booking,
    hotel_booking: HotelBooking,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TripResponse {
    #[serde(flatten)]
    booking: Booking,
    hotel_bookings: Vec<HotelBooking>,
}

#[derive(Debug, Serialize)]
struct CancelResponse {
    status: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route(
            "/v1/bookings/{hotel_booking_id}/cancel",
            post(cancel_own_reservation),
        )
        .route(
            "/v1/hotels/bookings/{hotel_booking_id}/cancel",
            post(cancel_reservation_as_owner),
        )
}

/// Total for the stay in cents. Checked arithmetic: a stay long or
/// pricey enough to overflow i32 is rejected, not wrapped.
fn stay_price(price_per_night: i32, rooms_booked: i32, stay: &StayRange) -> Result<i32, AppError> {
    i32::try_from(stay.nights())
        .ok()
        .and_then(|nights| {
            price_per_night
                .checked_mul(rooms_booked)?
                .checked_mul(nights)
        })
        .ok_or_else(|| {
            AppError::ValidationError("Stay price exceeds the supported range".to_string())
        })
}

/// Book rooms for a stay. The availability check and the inserts run
/// in one transaction holding the room-type row lock, so two requests
/// racing for the last rooms cannot both pass the check.
async fn create_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<CreateBookingResponse>, AppError> {
    let claims = authenticate(&bearer, &state.auth.secret)?;
    let user_id = claims.user_id()?;

    if req.rooms_booked <= 0 {
        return Err(AppError::ValidationError(
            "Rooms booked must be positive".to_string(),
        ));
    }

    let mut tx = state.db.pool.begin().await?;

    let room_type = RoomRepository::lock_room_type(&mut tx, req.room_type_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Room type not found".to_string()))?;

    let confirmed =
        RoomRepository::confirmed_overlapping(&mut *tx, room_type.id, &req.stay).await?;
    check_request(room_type.total_rooms, &req.stay, req.rooms_booked, &confirmed)
        .map_err(|e| AppError::ConflictError(e.to_string()))?;

    let total_price = stay_price(room_type.price_per_night, req.rooms_booked, &req.stay)?;

    let booking = BookingRepository::create_booking(&mut tx, user_id).await?;
    let hotel_booking = BookingRepository::create_hotel_booking(
        &mut tx,
        booking.id,
        room_type.hotel_id,
        room_type.id,
        &req.stay,
        req.rooms_booked,
        total_price,
    )
    .await?;

    tx.commit().await?;

    info!(booking_id = %booking.id, rooms = req.rooms_booked, "booking confirmed");

    // Confirmation is best-effort once the booking is committed.
    if let Err(e) = NotificationRepository::create(
        &state.db.pool,
        user_id,
        NotificationKind::BookingConfirmation,
        &format!(
            "Your booking has been confirmed, your booking reference is {}",
            booking.id
        ),
    )
    .await
    {
        warn!("failed to record booking confirmation: {}", e);
    }

    Ok(Json(CreateBookingResponse {
        booking,
        hotel_booking,
    }))
}

async fn list_bookings(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Vec<TripResponse>>, AppError> {
    let claims = authenticate(&bearer, &state.auth.secret)?;
    let user_id = claims.user_id()?;

    let bookings = BookingRepository::list_for_user(&state.db.pool, user_id).await?;
    let ids: Vec<Uuid> = bookings.iter().map(|b| b.id).collect();
    let hotel_bookings = BookingRepository::list_hotel_bookings(&state.db.pool, &ids).await?;

    let mut per_booking: std::collections::HashMap<Uuid, Vec<HotelBooking>> =
        std::collections::HashMap::new();
    for hb in hotel_bookings {
        per_booking.entry(hb.booking_id).or_default().push(hb);
    }

    let trips = bookings
        .into_iter()
        .map(|booking| TripResponse {
            hotel_bookings: per_booking.remove(&booking.id).unwrap_or_default(),
            booking,
        })
        .collect();

    Ok(Json(trips))
}

/// A traveller cancels their own reservation: the hotel booking goes
/// to Cancelled and the parent trip is marked Changed.
async fn cancel_own_reservation(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(hotel_booking_id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let claims = authenticate(&bearer, &state.auth.secret)?;
    let user_id = claims.user_id()?;

    let context = BookingRepository::find_context(&state.db.pool, hotel_booking_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Booking not found".to_string()))?;

    if context.traveller_id != user_id {
        return Err(AppError::AuthorizationError(
            "You are not authorized to cancel this reservation".to_string(),
        ));
    }

    let mut tx = state.db.pool.begin().await?;
    BookingRepository::set_booking_status(
        &mut tx,
        context.hotel_booking.booking_id,
        BookingStatus::Changed,
    )
    .await?;
    BookingRepository::set_hotel_booking_status(&mut tx, hotel_booking_id, BookingStatus::Cancelled)
        .await?;
    tx.commit().await?;

    info!(hotel_booking_id = %hotel_booking_id, "reservation cancelled by traveller");

    Ok(Json(CancelResponse {
        status: BookingStatus::Cancelled.to_string(),
    }))
}

/// A hotel owner cancels a reservation at their hotel; the traveller
/// is notified in the same transaction.
async fn cancel_reservation_as_owner(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(hotel_booking_id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let claims = authenticate(&bearer, &state.auth.secret)?;
    let user_id = claims.user_id()?;

    let context = BookingRepository::find_context(&state.db.pool, hotel_booking_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Booking not found".to_string()))?;

    if context.hotel_owner_id != user_id {
        return Err(AppError::AuthorizationError(
            "You are not authorized to cancel this reservation".to_string(),
        ));
    }

    let mut tx = state.db.pool.begin().await?;
    BookingRepository::set_booking_status(
        &mut tx,
        context.hotel_booking.booking_id,
        BookingStatus::Changed,
    )
    .await?;
    BookingRepository::set_hotel_booking_status(&mut tx, hotel_booking_id, BookingStatus::Cancelled)
        .await?;
    NotificationRepository::create(
        &mut *tx,
        context.traveller_id,
        NotificationKind::Cancellation,
        &format!(
            "Your booking at {} with booking ID {} has been cancelled by the hotel owner",
            context.hotel_name, context.hotel_booking.booking_id
        ),
    )
    .await?;
    tx.commit().await?;

    info!(hotel_booking_id = %hotel_booking_id, "reservation cancelled by hotel owner");

    Ok(Json(CancelResponse {
        status: BookingStatus::Cancelled.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_rejects_inverted_stays_at_the_parse_boundary() {
        let body = serde_json::json!({
            "roomTypeId": "6f9619ff-8b86-4d01-b42d-00cf4fc964ff",
            "checkIn": "2024-06-05",
            "checkOut": "2024-06-01",
            "roomsBooked": 2
        });
        assert!(serde_json::from_value::<CreateBookingRequest>(body).is_err());
    }

    #[test]
    fn create_request_parses_camel_case_fields() {
        let body = serde_json::json!({
            "roomTypeId": "6f9619ff-8b86-4d01-b42d-00cf4fc964ff",
            "checkIn": "2024-06-01",
            "checkOut": "2024-06-05",
            "roomsBooked": 2
        });
        let req: CreateBookingRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.rooms_booked, 2);
        assert_eq!(req.stay.nights(), 4);
    }

    fn stay(a: &str, b: &str) -> StayRange {
        StayRange::new(a.parse().unwrap(), b.parse().unwrap()).unwrap()
    }

    #[test]
    fn stay_price_multiplies_nights_rooms_and_rate() {
        let price = stay_price(15_000, 2, &stay("2024-06-01", "2024-06-05")).unwrap();
        assert_eq!(price, 15_000 * 2 * 4);
    }

    #[test]
    fn stay_price_rejects_overflowing_totals() {
        // A multi-year stay on a maximally priced room must not wrap.
        let result = stay_price(i32::MAX, 3, &stay("2024-01-01", "2030-01-01"));
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}
