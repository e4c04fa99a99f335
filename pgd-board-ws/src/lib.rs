pub mod config;
pub mod rest;
pub mod transport;

pub use config::{default_config_path, load_config, SyncConfig};
pub use rest::{RestClient, RestError};
pub use transport::WsTransport;
