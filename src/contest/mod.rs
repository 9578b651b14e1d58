// src/contest/mod.rs

pub mod anticheat;
pub mod countdown;
pub mod machine;
pub mod runner;
