//! Domain types, scoring rules and the service built on them

pub mod allocation;
pub mod analytics;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod error;
pub mod instrument;
pub mod log;
pub mod profile;
pub mod ranking;
pub mod scoring;
pub mod service;
pub mod source;
pub mod text;

// Re-export main types for cleaner imports
pub use error::{Error, Result};
pub use instrument::InstrumentRecord;
pub use service::FundService;
pub use source::{BenchmarkRateProvider, DocumentParser, InstrumentRepository};
