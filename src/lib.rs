pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod scheduled_task;
pub mod session;

pub use config::Config;
pub use error::{Error, Result};
