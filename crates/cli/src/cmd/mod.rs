//! CLI command implementations

pub mod config;
pub mod scan;
pub mod start;
pub mod status;
pub mod stop;
