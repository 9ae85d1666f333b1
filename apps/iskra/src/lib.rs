//! # iskra (library surface)
//!
//! Exposes the app's modules so integration tests can build routers
//! and collaborator models without going through the binary.

pub mod api;
pub mod cli;
pub mod config;
pub mod model;
