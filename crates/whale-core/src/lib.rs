//! Whale Core
//!
//! Shared domain types, error taxonomy, configuration, and database
//! repositories for the whale tracker system.

pub mod config;
pub mod db;
pub mod error;
pub mod sink;
pub mod types;

pub use error::{Error, Result};
