//! Analysis of the collected sources for reporting.

pub mod aggregator;

pub use aggregator::*;
