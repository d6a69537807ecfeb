pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod hotel_repo;
pub mod notification_repo;
pub mod room_repo;

pub use booking_repo::BookingRepository;
pub use database::{DbClient, StoreError};
pub use hotel_repo::HotelRepository;
pub use notification_repo::NotificationRepository;
pub use room_repo::RoomRepository;
