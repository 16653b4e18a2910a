//! Stats module - grouped counts and frequency tables

mod aggregator;

pub use aggregator::{Aggregator, AggregateError, FINAL_STATUS_LABELS, GROUP_FLAGS};
