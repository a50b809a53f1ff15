//! CLI command implementations

pub mod classify;
pub mod import;
pub mod init_config;
pub mod reconcile;
pub mod split;
