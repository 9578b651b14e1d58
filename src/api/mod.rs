// src/api/mod.rs

pub mod announcements;
pub mod auth;
pub mod badges;
pub mod client;
pub mod contests;
pub mod events;
pub mod logs;
pub mod notifications;
pub mod projects;
pub mod students;
