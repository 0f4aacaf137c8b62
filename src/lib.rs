//! # Rent Reviews Library
//!
//! Core of the rental review service: domain rules, persistence, HTTP
//! handlers and server configuration.

pub mod auth;
pub mod config;
pub mod cursor;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;
