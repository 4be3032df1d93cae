//! Digit-Eyes integration
//!
//! Specialized product database, last remote source in the resolver chain.

mod adapter;
mod client;
mod dto;

pub use client::{DEFAULT_BASE_URL, DigitEyesClient};
