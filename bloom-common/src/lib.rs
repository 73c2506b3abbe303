//! # Bloom Common Library
//!
//! Shared code for the Bloom Planner services including:
//! - Database models, schema, and pool initialization
//! - Subscription tier ordering and parsing
//! - Configuration loading
//! - Common error types
//! - Time formatting helpers

pub mod config;
pub mod db;
pub mod error;
pub mod tier;
pub mod time;

pub use error::{Error, Result};
pub use tier::Tier;
