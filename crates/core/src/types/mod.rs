//! Core types for Storekeep.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod country;
pub mod email;
pub mod id;
pub mod money;
pub mod permission;

pub use address::{Address, AddressFormatter};
pub use country::{Country, CountryDirectory, StaticCountryDirectory, Zone};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, CurrencyParseError, Money};
pub use permission::{Permission, PermissionParseError};
