// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod crawl;
mod link;
mod result;

// Re-export all public types
pub use config::{BackendKind, BrowserConfig, Config, CrawlerConfig, MarkerConfig, OutputConfig};
pub use crawl::{CrawlState, CrawlSummary};
pub use link::MunicipalityLink;
pub use result::{ExtractionResult, Strategy};
