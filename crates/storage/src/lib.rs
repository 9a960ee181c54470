//! Storage abstraction and implementations for est.
//!
//! This crate provides a trait-based storage interface for the estfile, with
//! a single-document JSON implementation.

#![warn(missing_docs)]

pub mod estfile;
pub mod trait_;
pub mod json_storage;

pub use estfile::{EstFile, ESTFILE_VERSION};
pub use trait_::{Storage, StorageError, Result};
pub use json_storage::JsonStorage;
