//! Cinemood: scene-by-scene emotion analysis of movie plots.

pub mod api_types;
pub mod budget;
pub mod chart;
pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod insights;
pub mod models;
pub mod orchestrator;
pub mod render;
pub mod report;
pub mod segment;
pub mod server;
