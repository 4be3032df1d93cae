//! Open Food Facts integration
//!
//! The comprehensive structured database, first in the resolver chain.
//! API docs: https://openfoodfacts.github.io/openfoodfacts-server/api/

mod adapter;
mod client;
mod dto;

pub use client::{DEFAULT_BASE_URL, OpenFoodFactsClient};
