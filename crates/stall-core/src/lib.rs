//! Core types and trait definitions for the Stall marketplace.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod error;
pub mod identity;
pub mod price;
pub mod product;
pub mod query;
pub mod store;

pub use error::{Error, FieldError, Result, ValidationErrors};
