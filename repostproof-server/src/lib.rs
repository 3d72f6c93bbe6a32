//! HTTP front-end for the repostproof randomized re-encoding service.
//!
//! The binary in `main.rs` wires configuration, logging, and the real
//! engine runner into the router defined here; tests build the same router
//! around a mock runner.

pub mod config;
pub mod error;
pub mod handlers;
