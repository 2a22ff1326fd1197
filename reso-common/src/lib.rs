//! # reso Common Library
//!
//! Shared code for the reso service crates:
//! - Error type used below the HTTP layer
//! - Configuration loading (CLI > ENV > TOML > defaults)
//! - Log area tags for structured logging
//! - Database schema and row models

pub mod config;
pub mod db;
pub mod error;
pub mod log_area;
pub mod time;

pub use error::{Error, Result};
pub use log_area::LogArea;
