//! Data structures for race configuration.
//!
//! This module contains pure data structures deserialized from RON files.
//! Validation happens here; lookups and file loading live in
//! [`crate::races`].

mod race_data;

pub use race_data::RaceData;
