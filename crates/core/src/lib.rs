//! Driftwood Core - Shared types library.
//!
//! This crate provides common types used across all Driftwood components:
//! - `storefront` - Public-facing e-commerce site
//! - `integration-tests` - End-to-end checkout flow tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
