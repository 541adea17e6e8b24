//! Application services: feed reads, post writes and their collaborators.

pub mod enrichment;
pub mod error;
pub mod identity;
pub mod posts;
pub mod rate_limit;
pub mod repos;
