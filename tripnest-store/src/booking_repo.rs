use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, Postgres, Transaction};
use uuid::Uuid;

use tripnest_core::booking::{Booking, BookingStatus, HotelBooking};
use tripnest_core::stay::StayRange;

use crate::database::StoreError;

pub struct BookingRepository;

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_domain(self) -> Result<Booking, StoreError> {
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| StoreError::CorruptRow(format!("booking {}: status {}", self.id, self.status)))?;
        Ok(Booking {
            id: self.id,
            user_id: self.user_id,
            status,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct HotelBookingRow {
    id: Uuid,
    booking_id: Uuid,
    hotel_id: Uuid,
    room_type_id: Uuid,
    check_in: chrono::NaiveDate,
    check_out: chrono::NaiveDate,
    rooms_booked: i32,
    total_price: i32,
    status: String,
    created_at: DateTime<Utc>,
}

impl HotelBookingRow {
    fn into_domain(self) -> Result<HotelBooking, StoreError> {
        let status = BookingStatus::parse(&self.status).ok_or_else(|| {
            StoreError::CorruptRow(format!("hotel_booking {}: status {}", self.id, self.status))
        })?;
        let stay = StayRange::new(self.check_in, self.check_out)
            .map_err(|e| StoreError::CorruptRow(format!("hotel_booking {}: {}", self.id, e)))?;
        Ok(HotelBooking {
            id: self.id,
            booking_id: self.booking_id,
            hotel_id: self.hotel_id,
            room_type_id: self.room_type_id,
            stay,
            rooms_booked: self.rooms_booked,
            total_price: self.total_price,
            status,
            created_at: self.created_at,
        })
    }
}

/// A hotel booking joined with the facts the cancellation flows need
/// to authorize and notify: who owns the hotel, who travelled.
#[derive(Debug)]
pub struct HotelBookingContext {
    pub hotel_booking: HotelBooking,
    pub hotel_owner_id: Uuid,
    pub hotel_name: String,
    pub traveller_id: Uuid,
}

impl BookingRepository {
    pub async fn create_booking(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> Result<Booking, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(
            "INSERT INTO bookings (id, user_id, status)
             VALUES ($1, $2, 'Confirmed')
             RETURNING id, user_id, status, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;
        row.into_domain()
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_hotel_booking(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
        hotel_id: Uuid,
        room_type_id: Uuid,
        stay: &StayRange,
        rooms_booked: i32,
        total_price: i32,
    ) -> Result<HotelBooking, StoreError> {
        let row = sqlx::query_as::<_, HotelBookingRow>(
            "INSERT INTO hotel_bookings
                 (id, booking_id, hotel_id, room_type_id, check_in, check_out,
                  rooms_booked, total_price, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'Confirmed')
             RETURNING id, booking_id, hotel_id, room_type_id, check_in, check_out,
                       rooms_booked, total_price, status, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(booking_id)
        .bind(hotel_id)
        .bind(room_type_id)
        .bind(stay.check_in())
        .bind(stay.check_out())
        .bind(rooms_booked)
        .bind(total_price)
        .fetch_one(&mut **tx)
        .await?;
        row.into_domain()
    }

    pub async fn set_hotel_booking_status(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE hotel_bookings SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn set_booking_status(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE bookings SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn find_context<'e>(
        executor: impl PgExecutor<'e>,
        hotel_booking_id: Uuid,
    ) -> Result<Option<HotelBookingContext>, StoreError> {
        #[derive(sqlx::FromRow)]
        struct ContextRow {
            #[sqlx(flatten)]
            hotel_booking: HotelBookingRow,
            hotel_owner_id: Uuid,
            hotel_name: String,
            traveller_id: Uuid,
        }

        let row = sqlx::query_as::<_, ContextRow>(
            "SELECT hb.id, hb.booking_id, hb.hotel_id, hb.room_type_id,
                    hb.check_in, hb.check_out, hb.rooms_booked, hb.total_price,
                    hb.status, hb.created_at,
                    h.owner_id AS hotel_owner_id, h.name AS hotel_name,
                    b.user_id AS traveller_id
             FROM hotel_bookings hb
             JOIN hotels h ON h.id = hb.hotel_id
             JOIN bookings b ON b.id = hb.booking_id
             WHERE hb.id = $1",
        )
        .bind(hotel_booking_id)
        .fetch_optional(executor)
        .await?;

        row.map(|r| {
            Ok(HotelBookingContext {
                hotel_booking: r.hotel_booking.into_domain()?,
                hotel_owner_id: r.hotel_owner_id,
                hotel_name: r.hotel_name,
                traveller_id: r.traveller_id,
            })
        })
        .transpose()
    }

    pub async fn sibling_statuses(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> Result<Vec<BookingStatus>, StoreError> {
        let rows: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, status FROM hotel_bookings WHERE booking_id = $1")
                .bind(booking_id)
                .fetch_all(&mut **tx)
                .await?;

        rows.into_iter()
            .map(|(id, status)| {
                BookingStatus::parse(&status).ok_or_else(|| {
                    StoreError::CorruptRow(format!("hotel_booking {}: status {}", id, status))
                })
            })
            .collect()
    }

    pub async fn list_for_user<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
    ) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT id, user_id, status, created_at
             FROM bookings WHERE user_id = $1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        rows.into_iter().map(BookingRow::into_domain).collect()
    }

    pub async fn list_hotel_bookings<'e>(
        executor: impl PgExecutor<'e>,
        booking_ids: &[Uuid],
    ) -> Result<Vec<HotelBooking>, StoreError> {
        let rows = sqlx::query_as::<_, HotelBookingRow>(
            "SELECT id, booking_id, hotel_id, room_type_id, check_in, check_out,
                    rooms_booked, total_price, status, created_at
             FROM hotel_bookings WHERE booking_id = ANY($1)
             ORDER BY created_at DESC",
        )
        .bind(booking_ids)
        .fetch_all(executor)
        .await?;
        rows.into_iter().map(HotelBookingRow::into_domain).collect()
    }
}
