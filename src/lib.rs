//! ClipForge API server library
//!
//! API-key authentication and per-key rate limiting for the public API, dashboard CRUD for
//! keys and webhook endpoints, and the token-protected media proxy AssemblyAI pulls from.

pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;
pub mod utils;

pub use config::AppSettings;
pub use error::AppError;
