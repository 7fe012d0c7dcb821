//! # Dominion Development Tools
//!
//! Command-line tools for working on game data:
//! - Race data validation
//! - Scenario invasions resolved end to end

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod scenario;
pub mod validate;
