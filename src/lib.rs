pub mod config;
pub mod db_pool;
pub mod db_schema;
pub mod error;
pub mod handlers_health;
pub mod handlers_photo;
pub mod handlers_records;
pub mod models;
pub mod photo_store;
pub mod record_store;
pub mod warp_helpers;
