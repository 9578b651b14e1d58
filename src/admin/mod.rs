// src/admin/mod.rs

pub mod console;
pub mod generator;
