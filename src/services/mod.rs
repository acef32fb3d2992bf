//! Service layer for the crawler application.
//!
//! This module contains the business logic for:
//! - Listing link collection (`LinkCollector`)
//! - Listing traversal (`PaginationWalker`)
//! - Detail page extraction (`DetailExtractor`, `strategies`)
//! - Run orchestration (`MayorCrawler`)

mod crawl;
mod detail;
mod links;
mod pagination;
pub mod strategies;

pub use crawl::{CrawlOutcome, MayorCrawler};
pub use detail::DetailExtractor;
pub use links::{LinkCollector, dedup_by_url};
pub use pagination::{PaginationWalker, StopReason, WalkOutcome, WalkState, next_page_locators};
