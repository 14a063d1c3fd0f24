//! Storekeep Core - Shared value types.
//!
//! This crate provides the value types used across all Storekeep components:
//! - `orders` - Order lifecycle, checkout pipeline and access policy
//! - `cli` - Command-line tools for migrations and order management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access.
//! Country and zone data come in through the [`CountryDirectory`] trait so
//! address formatting stays pure.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, email, money, permissions, addresses and countries

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
