//! Command handlers for CLI subcommands
//!
//! This module contains the implementation logic for each CLI subcommand.

mod completions;
mod config;
mod map;
mod send;
mod utils;
mod validate;

pub use completions::handle_completions;
pub use config::handle_config;
pub use map::handle_map;
pub use send::handle_send;
pub use validate::handle_validate;
