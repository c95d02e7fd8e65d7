// src/handlers/mod.rs

pub mod attempts;
pub mod rankings;
pub mod series;
