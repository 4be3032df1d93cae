//! Google Custom Search integration
//!
//! Broad web search, second in the resolver chain. Finds products that no
//! structured database lists, at the cost of noisier data.

mod adapter;
mod client;
mod dto;

pub use client::{DEFAULT_BASE_URL, GoogleSearchClient};
