//! Dossier Audit Library
//!
//! This crate turns the raw audit log of a business dossier into a filtered,
//! grouped and human-readable timeline of operations.

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use services::{AuditTrailView, LogLoader, StrategyRegistry, StrategyResolver};
pub use utils::{AppError, AppResult};
