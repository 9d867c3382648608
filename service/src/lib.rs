//! Process-wide infrastructure: command line and environment configuration,
//! and logger setup.
pub mod config;
pub mod logging;
