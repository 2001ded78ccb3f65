//! Type definitions

pub mod customer;
pub mod import;
pub mod invoice;
pub mod job;
pub mod metrics;
pub mod technician;

pub use customer::*;
pub use import::*;
pub use invoice::*;
pub use job::*;
pub use metrics::*;
pub use technician::*;
