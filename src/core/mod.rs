pub mod batch;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod job;
pub mod lifecycle;
pub mod status;
pub mod store;
pub mod transition;
