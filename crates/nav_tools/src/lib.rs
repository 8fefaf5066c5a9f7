//! # Nav Development Tools
//!
//! Command-line tools for development:
//! - Unit kind data validation
//! - Headless navigation scenarios

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod scenario;
pub mod validate;
