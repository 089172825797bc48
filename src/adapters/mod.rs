//! Concrete port implementations.

pub mod file_cache_adapter;
pub mod csv_adapter;
pub mod metals_api_adapter;
pub mod file_config_adapter;
pub mod tokio_sleep_adapter;
