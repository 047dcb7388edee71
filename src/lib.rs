//! autogit - Git auto-commit daemon library
//!
//! This library exposes the daemon lifecycle, the commit pipeline and the
//! control surface used by the `autogit` binary.

pub mod backend;
pub mod cli;
pub mod config;
pub mod constants;
pub mod control;
pub mod daemon;
pub mod error;
pub mod git;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod output;
pub mod store;
