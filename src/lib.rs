//! Chirp: a short-post feed service.
//!
//! Reads return the newest posts joined with author profiles from an external
//! identity service, served through a bounded TTL cache. Writes are validated
//! and limited per author with a sliding window shared across instances.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
