// ABOUTME: Library root for rollkeeper - reconciles hypervisor containers toward declared digests.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod error;
pub mod health;
pub mod probe;
pub mod registry;
pub mod runner;
pub mod runtime;
pub mod spec;
pub mod state;
pub mod types;
