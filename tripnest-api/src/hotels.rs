use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use tripnest_core::booking::{Hotel, RoomType};
use tripnest_core::stay::StayRange;
use tripnest_store::hotel_repo::{HotelSearchFilters, HotelSearchResult};
use tripnest_store::HotelRepository;

use crate::auth::authenticate;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateHotelRequest {
    name: String,
    address: String,
    #[serde(default)]
    star_rating: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomTypeRequest {
    name: String,
    description: Option<String>,
    price_per_night: i32,
    total_rooms: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchQuery {
    city: Option<String>,
    name: Option<String>,
    min_price: Option<i32>,
    max_price: Option<i32>,
    star_rating: Option<i32>,
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/hotels", post(create_hotel))
        .route("/v1/hotels/{hotel_id}/rooms", post(add_room_type))
        .route("/v1/hotels/search", get(search_hotels))
}

async fn create_hotel(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<CreateHotelRequest>,
) -> Result<Json<Hotel>, AppError> {
    let claims = authenticate(&bearer, &state.auth.secret)?;
    let owner_id = claims.user_id()?;

    if req.name.trim().is_empty() || req.address.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Hotel name and address are required".to_string(),
        ));
    }
    if !(0..=5).contains(&req.star_rating) {
        return Err(AppError::ValidationError(
            "Star rating must be between 0 and 5".to_string(),
        ));
    }

    let hotel = HotelRepository::create_hotel(
        &state.db.pool,
        owner_id,
        req.name.trim(),
        req.address.trim(),
        req.star_rating,
    )
    .await?;

    info!(hotel_id = %hotel.id, "hotel listed");
    Ok(Json(hotel))
}

async fn add_room_type(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(hotel_id): Path<Uuid>,
    Json(req): Json<CreateRoomTypeRequest>,
) -> Result<Json<RoomType>, AppError> {
    let claims = authenticate(&bearer, &state.auth.secret)?;
    let user_id = claims.user_id()?;

    if req.total_rooms < 0 {
        return Err(AppError::ValidationError(
            "Total rooms cannot be negative".to_string(),
        ));
    }
    if req.price_per_night < 0 {
        return Err(AppError::ValidationError(
            "Price per night cannot be negative".to_string(),
        ));
    }

    let hotel = HotelRepository::find_hotel(&state.db.pool, hotel_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Hotel not found".to_string()))?;

    if hotel.owner_id != user_id {
        return Err(AppError::AuthorizationError(
            "You are not authorized to add rooms to this hotel".to_string(),
        ));
    }

    let room_type = HotelRepository::create_room_type(
        &state.db.pool,
        hotel.id,
        req.name.trim(),
        req.description.as_deref(),
        req.price_per_night,
        req.total_rooms,
    )
    .await?;

    Ok(Json(room_type))
}

/// Public hotel search; with checkIn/checkOut each surviving room type
/// carries its availability for the stay.
async fn search_hotels(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<HotelSearchResult>>, AppError> {
    let stay = match (query.check_in, query.check_out) {
        (Some(check_in), Some(check_out)) => Some(StayRange::new(check_in, check_out)?),
        (None, None) => None,
        _ => {
            return Err(AppError::ValidationError(
                "checkIn and checkOut must be provided together".to_string(),
            ))
        }
    };

    let filters = HotelSearchFilters {
        city: query.city.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
        name: query.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        min_price: query.min_price.unwrap_or(0),
        max_price: query.max_price.unwrap_or(i32::MAX),
        star_rating: query.star_rating.unwrap_or(0),
        stay,
    };

    let results = HotelRepository::search(&state.db, &filters).await?;
    Ok(Json(results))
}
