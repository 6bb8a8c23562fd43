//! Port traits the domain talks to.

pub mod config_port;
pub mod data_port;
pub mod export_port;
pub mod ticker_store_port;
