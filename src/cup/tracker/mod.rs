pub mod checkin;
pub mod clock;
pub mod config;
pub mod error;
pub mod index;
pub mod io;
pub mod logging;
pub mod model;
pub mod ranking;
pub mod saga;
pub mod schedule;
pub mod service;
pub mod transcript;
pub mod transfer;

pub use error::{Result, TrackerError};
