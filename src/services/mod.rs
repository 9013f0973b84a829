pub mod date_tracker;
pub mod sync_service;
