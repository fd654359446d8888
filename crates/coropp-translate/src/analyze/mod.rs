//! Per-lambda analysis: the scope-and-yield model and its builder.

mod analyzer;
mod captures;
pub mod model;

#[cfg(test)]
mod captures_tests;

pub use analyzer::analyze;
pub use captures::{DefaultCapture, Param, parse_capture_list, parse_params};
