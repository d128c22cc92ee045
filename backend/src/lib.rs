//! Report Generation service: health checks, the JWT-protected dashboard
//! API and database migrations.

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
