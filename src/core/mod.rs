//! Core domain types: identifiers, clocks, reminder requests and task records.

pub mod clock;
pub mod plan;
pub mod request;
pub mod task;
pub mod types;
