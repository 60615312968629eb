//! Olist growth analytics
//!
//! Loads the processed order table and the per-customer cluster table,
//! maps raw clusters to business segments and renders the health, friction
//! and segmentation views to the terminal or over REST.

pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod insights;
pub mod loader;
pub mod models;
pub mod report;
pub mod segments;
pub mod state_names;

pub use error::{DashboardError, Result};
