// src/lib.rs

//! Mayor contact crawler library.
//!
//! Walks the national administrative register's municipality listing with a
//! browser session and extracts each mayor's name and email addresses.

pub mod browser;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
