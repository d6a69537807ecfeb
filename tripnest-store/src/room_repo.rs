use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, Postgres, Transaction};
use uuid::Uuid;

use tripnest_core::booking::RoomType;
use tripnest_core::reconcile::ReservationWindow;
use tripnest_core::stay::StayRange;

use crate::database::StoreError;

pub struct RoomRepository;

#[derive(sqlx::FromRow)]
struct RoomTypeRow {
    id: Uuid,
    hotel_id: Uuid,
    name: String,
    description: Option<String>,
    price_per_night: i32,
    total_rooms: i32,
}

impl From<RoomTypeRow> for RoomType {
    fn from(row: RoomTypeRow) -> Self {
        RoomType {
            id: row.id,
            hotel_id: row.hotel_id,
            name: row.name,
            description: row.description,
            price_per_night: row.price_per_night,
            total_rooms: row.total_rooms,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WindowRow {
    hotel_booking_id: Uuid,
    booking_id: Uuid,
    user_id: Uuid,
    check_in: chrono::NaiveDate,
    check_out: chrono::NaiveDate,
    rooms_booked: i32,
    created_at: DateTime<Utc>,
}

impl WindowRow {
    fn into_window(self) -> Result<ReservationWindow, StoreError> {
        let stay = StayRange::new(self.check_in, self.check_out)
            .map_err(|e| StoreError::CorruptRow(format!("hotel_booking {}: {}", self.hotel_booking_id, e)))?;
        Ok(ReservationWindow {
            hotel_booking_id: self.hotel_booking_id,
            booking_id: self.booking_id,
            user_id: self.user_id,
            stay,
            rooms_booked: self.rooms_booked,
            created_at: self.created_at,
        })
    }
}

impl RoomRepository {
    /// Room type together with the owning hotel's owner id, for
    /// authorization checks before any inventory mutation.
    pub async fn find_room_type_with_owner<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<(RoomType, Uuid)>, StoreError> {
        #[derive(sqlx::FromRow)]
        struct OwnedRow {
            #[sqlx(flatten)]
            room_type: RoomTypeRow,
            owner_id: Uuid,
        }

        let row = sqlx::query_as::<_, OwnedRow>(
            "SELECT rt.id, rt.hotel_id, rt.name, rt.description, rt.price_per_night,
                    rt.total_rooms, h.owner_id
             FROM room_types rt
             JOIN hotels h ON h.id = rt.hotel_id
             WHERE rt.id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(row.map(|r| (RoomType::from(r.room_type), r.owner_id)))
    }

    /// Row-level lock on the room type for the duration of a
    /// check-then-act sequence (availability check + insert, or the
    /// whole reconciliation). Serializes concurrent mutations of one
    /// room type without blocking the rest of the table.
    pub async fn lock_room_type(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<RoomType>, StoreError> {
        let row = sqlx::query_as::<_, RoomTypeRow>(
            "SELECT id, hotel_id, name, description, price_per_night, total_rooms
             FROM room_types WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(RoomType::from))
    }

    /// Confirmed stays of a room type overlapping `[start, end)`, as
    /// `(stay, rooms_booked)` pairs for the availability calculator.
    pub async fn confirmed_overlapping<'e>(
        executor: impl PgExecutor<'e>,
        room_type_id: Uuid,
        range: &StayRange,
    ) -> Result<Vec<(StayRange, i32)>, StoreError> {
        #[derive(sqlx::FromRow)]
        struct OverlapRow {
            id: Uuid,
            check_in: chrono::NaiveDate,
            check_out: chrono::NaiveDate,
            rooms_booked: i32,
        }

        let rows = sqlx::query_as::<_, OverlapRow>(
            "SELECT id, check_in, check_out, rooms_booked
             FROM hotel_bookings
             WHERE room_type_id = $1
               AND status = 'Confirmed'
               AND check_in < $3
               AND check_out > $2",
        )
        .bind(room_type_id)
        .bind(range.check_in())
        .bind(range.check_out())
        .fetch_all(executor)
        .await?;

        rows.into_iter()
            .map(|r| {
                let stay = StayRange::new(r.check_in, r.check_out)
                    .map_err(|e| StoreError::CorruptRow(format!("hotel_booking {}: {}", r.id, e)))?;
                Ok((stay, r.rooms_booked))
            })
            .collect()
    }

    /// Every confirmed reservation of a room type, newest parent
    /// booking first, shaped for the capacity-reduction planner.
    pub async fn confirmed_windows(
        tx: &mut Transaction<'_, Postgres>,
        room_type_id: Uuid,
    ) -> Result<Vec<ReservationWindow>, StoreError> {
        let rows = sqlx::query_as::<_, WindowRow>(
            "SELECT hb.id AS hotel_booking_id, hb.booking_id, b.user_id,
                    hb.check_in, hb.check_out, hb.rooms_booked, b.created_at
             FROM hotel_bookings hb
             JOIN bookings b ON b.id = hb.booking_id
             WHERE hb.room_type_id = $1 AND hb.status = 'Confirmed'
             ORDER BY b.created_at DESC",
        )
        .bind(room_type_id)
        .fetch_all(&mut **tx)
        .await?;

        rows.into_iter().map(WindowRow::into_window).collect()
    }

    pub async fn update_total_rooms(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        new_total: i32,
    ) -> Result<RoomType, StoreError> {
        let row = sqlx::query_as::<_, RoomTypeRow>(
            "UPDATE room_types SET total_rooms = $2 WHERE id = $1
             RETURNING id, hotel_id, name, description, price_per_night, total_rooms",
        )
        .bind(id)
        .bind(new_total)
        .fetch_one(&mut **tx)
        .await?;
        Ok(RoomType::from(row))
    }
}
