//! cheevo daemon internals
//!
//! Settings, the daemon lock, the achievement monitor, notification
//! backends and the daemon runner. The `cheevo` binary is a thin clap
//! front end over these modules.

pub mod config;
pub mod daemon;
pub mod locks;
pub mod monitor;
pub mod notifier;
pub mod util;

pub use config::Settings;
pub use monitor::Monitor;
