pub mod auth;
pub mod cache;
pub mod config;
pub mod cursor;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod services;
pub mod store;
