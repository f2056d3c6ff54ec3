//! Library exports for the AI Disguise backend
//!
//! This module exposes internal components for testing and potential library usage.

pub mod analytics;
pub mod config;
pub mod database;
pub mod error;
pub mod handler;
pub mod language;
pub mod middleware;
pub mod model;
pub mod prompt;
pub mod providers;
pub mod rate_limit;
pub mod route;
pub mod sanitize;
