//! BMS point-name benchmark library
//!
//! Tools for benchmarking NLP models on interpreting building management
//! system point names into structured fields.

pub mod adapters;
pub mod config;
pub mod dataset;
pub mod error;
pub mod eval;
pub mod report;
pub mod run_stats;
pub mod tokenize;
pub mod vocab;
