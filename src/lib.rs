// src/lib.rs

pub mod admin;
pub mod api;
pub mod cache;
pub mod config;
pub mod contest;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod notify;
pub mod problems;
pub mod routes;
pub mod session;
pub mod state;
pub mod utils;

pub use error::AppError;
pub use state::AppState;
