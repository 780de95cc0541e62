pub mod app;
pub mod cli;
pub mod commands;
pub mod config;

pub use app::TruthForge;
pub use config::Config;
