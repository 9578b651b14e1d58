// src/models/mod.rs

pub mod activity_log;
pub mod announcement;
pub mod attempt;
pub mod badge;
pub mod contest;
pub mod event;
pub mod notification;
pub mod problem;
pub mod project;
pub mod question;
pub mod user;
