pub mod config;
pub mod logger;

pub use config::{load_config, CodeSettings, CounterSettings, LockSettings, ServicesConfig};
pub use logger::init_logger;
