//! Configuration management
//!
//! Handles loading runtime settings from the environment.

pub mod settings;

pub use settings::{Settings, SslMode};
