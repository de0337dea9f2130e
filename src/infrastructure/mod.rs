pub mod activity_client;
pub mod activity_mapper;
pub mod calendar_surface;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod in_memory_backend;
pub mod logging;
pub mod notifier;
pub mod signal_mapper;
