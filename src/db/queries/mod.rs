//! Database queries

pub mod customer;
pub mod import;
pub mod invoice;
pub mod job;
pub mod metrics;
pub mod technician;
