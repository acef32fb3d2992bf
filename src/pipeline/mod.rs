//! Pipeline entry points for crawler operations.
//!
//! - `run_crawler`: Walk the listing (or load saved links) and write the CSV
//! - `run_link_discovery`: Walk the listing and save the links for later runs

pub mod crawl;
pub mod links;

pub use crawl::run_crawler;
pub use links::run_link_discovery;
