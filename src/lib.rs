pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod output;
pub mod score;
pub mod store;
