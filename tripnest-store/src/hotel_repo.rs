use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgExecutor;
use std::collections::HashMap;
use uuid::Uuid;

use tripnest_core::booking::{Hotel, RoomType};
use tripnest_core::stay::StayRange;

use crate::database::{DbClient, StoreError};

pub struct HotelRepository;

#[derive(sqlx::FromRow)]
struct HotelRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    address: String,
    star_rating: i32,
    created_at: DateTime<Utc>,
}

impl From<HotelRow> for Hotel {
    fn from(row: HotelRow) -> Self {
        Hotel {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            address: row.address,
            star_rating: row.star_rating,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Default)]
pub struct HotelSearchFilters {
    pub city: Option<String>,
    pub name: Option<String>,
    pub min_price: i32,
    pub max_price: i32,
    pub star_rating: i32,
    pub stay: Option<StayRange>,
}

/// A room type as the search surfaces it: capacity minus the summed
/// overlapping confirmed bookings, clamped at zero.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableRoomType {
    #[serde(flatten)]
    pub room_type: RoomType,
    pub available_rooms: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelSearchResult {
    #[serde(flatten)]
    pub hotel: Hotel,
    pub room_types: Vec<AvailableRoomType>,
}

impl HotelRepository {
    pub async fn create_hotel<'e>(
        executor: impl PgExecutor<'e>,
        owner_id: Uuid,
        name: &str,
        address: &str,
        star_rating: i32,
    ) -> Result<Hotel, StoreError> {
        let row = sqlx::query_as::<_, HotelRow>(
            "INSERT INTO hotels (id, owner_id, name, address, star_rating)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, owner_id, name, address, star_rating, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(name)
        .bind(address)
        .bind(star_rating)
        .fetch_one(executor)
        .await?;
        Ok(Hotel::from(row))
    }

    pub async fn find_hotel<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Hotel>, StoreError> {
        let row = sqlx::query_as::<_, HotelRow>(
            "SELECT id, owner_id, name, address, star_rating, created_at
             FROM hotels WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(row.map(Hotel::from))
    }

    pub async fn create_room_type<'e>(
        executor: impl PgExecutor<'e>,
        hotel_id: Uuid,
        name: &str,
        description: Option<&str>,
        price_per_night: i32,
        total_rooms: i32,
    ) -> Result<RoomType, StoreError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            id: Uuid,
            hotel_id: Uuid,
            name: String,
            description: Option<String>,
            price_per_night: i32,
            total_rooms: i32,
        }

        let row = sqlx::query_as::<_, Row>(
            "INSERT INTO room_types (id, hotel_id, name, description, price_per_night, total_rooms)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, hotel_id, name, description, price_per_night, total_rooms",
        )
        .bind(Uuid::new_v4())
        .bind(hotel_id)
        .bind(name)
        .bind(description)
        .bind(price_per_night)
        .bind(total_rooms)
        .fetch_one(executor)
        .await?;

        Ok(RoomType {
            id: row.id,
            hotel_id: row.hotel_id,
            name: row.name,
            description: row.description,
            price_per_night: row.price_per_night,
            total_rooms: row.total_rooms,
        })
    }

    /// Filtered hotel search. With a stay range, each room type carries
    /// its availability for that range and fully booked room types (and
    /// hotels left without any) drop out of the result.
    pub async fn search(
        db: &DbClient,
        filters: &HotelSearchFilters,
    ) -> Result<Vec<HotelSearchResult>, StoreError> {
        let hotels = sqlx::query_as::<_, HotelRow>(
            "SELECT h.id, h.owner_id, h.name, h.address, h.star_rating, h.created_at
             FROM hotels h
             WHERE ($1::text IS NULL OR h.address ILIKE '%' || $1 || '%')
               AND ($2::text IS NULL OR h.name ILIKE '%' || $2 || '%')
               AND h.star_rating >= $3
               AND EXISTS (
                   SELECT 1 FROM room_types rt
                   WHERE rt.hotel_id = h.id
                     AND rt.price_per_night BETWEEN $4 AND $5
               )
             ORDER BY h.star_rating DESC, h.name",
        )
        .bind(filters.city.as_deref())
        .bind(filters.name.as_deref())
        .bind(filters.star_rating)
        .bind(filters.min_price)
        .bind(filters.max_price)
        .fetch_all(&db.pool)
        .await?;

        if hotels.is_empty() {
            return Ok(Vec::new());
        }
        let hotel_ids: Vec<Uuid> = hotels.iter().map(|h| h.id).collect();

        #[derive(sqlx::FromRow)]
        struct RoomTypeRow {
            id: Uuid,
            hotel_id: Uuid,
            name: String,
            description: Option<String>,
            price_per_night: i32,
            total_rooms: i32,
        }

        let room_types = sqlx::query_as::<_, RoomTypeRow>(
            "SELECT id, hotel_id, name, description, price_per_night, total_rooms
             FROM room_types
             WHERE hotel_id = ANY($1) AND price_per_night BETWEEN $2 AND $3
             ORDER BY price_per_night",
        )
        .bind(&hotel_ids)
        .bind(filters.min_price)
        .bind(filters.max_price)
        .fetch_all(&db.pool)
        .await?;

        // Summed overlapping demand per room type, one query for the
        // whole result set.
        let mut booked: HashMap<Uuid, i64> = HashMap::new();
        if let Some(stay) = &filters.stay {
            let room_type_ids: Vec<Uuid> = room_types.iter().map(|rt| rt.id).collect();
            let rows: Vec<(Uuid, i64)> = sqlx::query_as(
                "SELECT room_type_id, COALESCE(SUM(rooms_booked), 0)
                 FROM hotel_bookings
                 WHERE room_type_id = ANY($1)
                   AND status = 'Confirmed'
                   AND check_in < $3
                   AND check_out > $2
                 GROUP BY room_type_id",
            )
            .bind(&room_type_ids)
            .bind(stay.check_in())
            .bind(stay.check_out())
            .fetch_all(&db.pool)
            .await?;
            booked.extend(rows);
        }

        let mut per_hotel: HashMap<Uuid, Vec<AvailableRoomType>> = HashMap::new();
        for rt in room_types {
            let available = match filters.stay {
                Some(_) => {
                    let taken = *booked.get(&rt.id).unwrap_or(&0) as i32;
                    (rt.total_rooms - taken).max(0)
                }
                None => rt.total_rooms,
            };
            if filters.stay.is_some() && available == 0 {
                continue;
            }
            per_hotel.entry(rt.hotel_id).or_default().push(AvailableRoomType {
                room_type: RoomType {
                    id: rt.id,
                    hotel_id: rt.hotel_id,
                    name: rt.name,
                    description: rt.description,
                    price_per_night: rt.price_per_night,
                    total_rooms: rt.total_rooms,
                },
                available_rooms: available,
            });
        }

        Ok(hotels
            .into_iter()
            .filter_map(|h| {
                let room_types = per_hotel.remove(&h.id)?;
                Some(HotelSearchResult {
                    hotel: Hotel::from(h),
                    room_types,
                })
            })
            .collect())
    }
}
