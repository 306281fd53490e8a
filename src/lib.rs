// src/lib.rs

//! Forum post harvester library.
//!
//! Crawls a cursor-paged forum feed into SQLite and enriches stored posts
//! with a relevance score and structured fields from a chat-completions model.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
