pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, ClassifierMode, ScrapeConfig};
pub use error::ParseError;
pub use types::*;
