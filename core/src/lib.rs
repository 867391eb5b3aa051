//! Core of the pantry recipe backend.
//!
//! Raw table records are classified into inventory and pantry records,
//! merged into one view per item, filtered down to what expires within the
//! next few days, and turned into an ingredient list for recipe generation.
//! The last generated recipe is kept in a single-slot file cache.

pub mod cache;
pub mod error;
pub mod expiry;
pub mod merge;
pub mod models;
pub mod service;

pub use error::PantryError;
