pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod progress;
pub mod server;
pub mod student;
pub mod utils;

pub use error::{Error, Result};
