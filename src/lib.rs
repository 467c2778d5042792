pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod launcher;
pub mod platform;
pub mod ports;
pub mod ready;
pub mod registry;

pub use error::{HarnessError, Result};
pub use registry::{global, LifecycleRegistry, Readiness, ServerAddress, ServerInstance};
