use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stay::StayRange;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Changed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Cancelled => "Cancelled",
            BookingStatus::Changed => "Changed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Confirmed" => Some(BookingStatus::Confirmed),
            "Cancelled" => Some(BookingStatus::Cancelled),
            "Changed" => Some(BookingStatus::Changed),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub address: String,
    pub star_rating: i32,
    pub created_at: DateTime<Utc>,
}

/// A bookable room category inside a hotel. `total_rooms` is the
/// capacity the availability invariant is checked against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomType {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_per_night: i32,
    pub total_rooms: i32,
}

/// One logical trip. Hotel reservations hang off it; its status is
/// derived from theirs (Changed on partial cancellation, Cancelled
/// when every reservation is cancelled).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

/// A reservation of `rooms_booked` rooms of one room type for a stay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelBooking {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub hotel_id: Uuid,
    pub room_type_id: Uuid,
    #[serde(flatten)]
    pub stay: StayRange,
    pub rooms_booked: i32,
    pub total_price: i32,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationKind {
    SystemUpdate,
    BookingConfirmation,
    Cancellation,
    Reminder,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::SystemUpdate => "SystemUpdate",
            NotificationKind::BookingConfirmation => "BookingConfirmation",
            NotificationKind::Cancellation => "Cancellation",
            NotificationKind::Reminder => "Reminder",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Changed,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("Pending"), None);
    }
}
