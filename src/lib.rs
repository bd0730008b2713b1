pub mod api_football;
pub mod confidence;
pub mod config;
pub mod data_source;
pub mod ensemble;
pub mod error;
pub mod fake_feed;
pub mod features;
pub mod http_cache;
pub mod http_client;
pub mod lineup_gate;
pub mod model_registry;
pub mod pipeline;
pub mod ranking;
pub mod types;
